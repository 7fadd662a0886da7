//! The answer engine: one request-scoped flow per question.
//!
//! shortcut check -> classify -> retrieve -> evidence policy -> prompt ->
//! provider chain -> validate/repair -> trace (fire-and-forget).

use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, instrument, warn};

use super::classify::{lock_to_registry, Classifier};
use super::generate::{PartialUpdate, ProviderChain};
use super::prompts::{answer_prompt, evidence_summary, MIN_EVIDENCE_PASSAGES};
use super::retrieve::Retriever;
use super::shortcuts::{find_shortcut, Shortcut};
use super::trace::TraceRecorder;
use super::validate::{check_generated, ValidationPolicy, ValidationReport};
use crate::error::{Result, TattvaError};
use crate::traits::StructuredPrompt;
use crate::types::{
    Answer, ClassificationResult, Generated, GenerationTrace, RetrievalResult, ShortcutKind,
    StructuralFilter, TemplateType, TokenUsage, Trace,
};

/// Provider label recorded for shortcut answers.
pub const SHORTCUT_PROVIDER: &str = "shortcut";

const EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub validation_policy: ValidationPolicy,
    /// Provider tried first when the request does not name one.
    pub default_provider: Option<String>,
}

/// One question to answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    pub question: String,
    /// Evidence from an earlier retrieve call; skips retrieval.
    #[serde(default)]
    pub retrieval: Option<RetrievalResult>,
    /// Classification from an earlier retrieve call; skips classification.
    /// Re-pinned to the category table before use. Never read from the wire.
    #[serde(skip)]
    pub classification: Option<ClassificationResult>,
    #[serde(default)]
    pub preferred_provider: Option<String>,
    #[serde(default)]
    pub filters: StructuralFilter,
}

impl AnswerRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    pub fn with_retrieval(mut self, retrieval: RetrievalResult) -> Self {
        self.retrieval = Some(retrieval);
        self
    }

    pub fn with_classification(mut self, classification: ClassificationResult) -> Self {
        self.classification = Some(classification);
        self
    }

    pub fn with_preferred_provider(mut self, provider: impl Into<String>) -> Self {
        self.preferred_provider = Some(provider.into());
        self
    }

    pub fn with_filters(mut self, filters: StructuralFilter) -> Self {
        self.filters = filters;
        self
    }
}

/// Output of the retrieve step, shown to the user before generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedContext {
    pub retrieval: RetrievalResult,
    pub classification: ClassificationResult,
}

/// A complete non-streamed answer: the trace fields, the answer served to
/// the user and its validation report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerOutcome {
    #[serde(flatten)]
    pub trace: Trace,
    pub full_response: Answer,
    pub validation: ValidationReport,
    /// The answer template was forced to refusal for lack of evidence.
    pub degraded: bool,
}

/// Sent once per streamed answer, before any generated text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerContext {
    pub classification: ClassificationResult,
    pub retrieval: RetrievalResult,
    /// Template actually used for generation.
    pub template: TemplateType,
    pub degraded: bool,
    pub evidence: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnswerEvent {
    Context(Box<AnswerContext>),
    Partial(PartialUpdate),
    Complete(Box<AnswerOutcome>),
    Failed { message: String },
}

/// Ordered answer events. Dropping the stream cancels generation.
pub struct AnswerStream {
    events: mpsc::Receiver<AnswerEvent>,
    _cancel_on_drop: DropGuard,
}

impl Stream for AnswerStream {
    type Item = AnswerEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_recv(cx)
    }
}

/// Everything decided before generation starts.
struct Plan {
    trace: Trace,
    classification: ClassificationResult,
    retrieval: RetrievalResult,
    template: TemplateType,
    degraded: bool,
    prompt: StructuredPrompt,
    preferred: Option<String>,
}

#[derive(Clone)]
pub struct AnswerEngine {
    chain: ProviderChain,
    classifier: Classifier,
    retriever: Retriever,
    recorder: TraceRecorder,
    config: EngineConfig,
}

impl AnswerEngine {
    pub fn new(chain: ProviderChain, retriever: Retriever, recorder: TraceRecorder) -> Self {
        Self {
            classifier: Classifier::new(chain.clone()),
            chain,
            retriever,
            recorder,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn chain(&self) -> &ProviderChain {
        &self.chain
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn preferred(&self, requested: Option<&str>) -> Option<String> {
        requested
            .map(str::to_string)
            .or_else(|| self.config.default_provider.clone())
    }

    /// Classify a question. Never fails.
    pub async fn classify(&self, question: &str, preferred: Option<&str>) -> ClassificationResult {
        let preferred = self.preferred(preferred);
        self.classifier.classify(question, preferred.as_deref()).await
    }

    /// Classify, then retrieve under the category's retrieval config.
    #[instrument(skip(self, filters))]
    pub async fn retrieve(&self, question: &str, filters: StructuralFilter) -> Result<RetrievedContext> {
        let classification = self.classify(question, None).await;
        let retrieval = self
            .retriever
            .retrieve(question, classification.category_id, filters)
            .await?;
        Ok(RetrievedContext {
            retrieval,
            classification,
        })
    }

    /// Answer a question and return the complete, validated answer.
    #[instrument(skip(self, request), fields(question = %request.question))]
    pub async fn answer(&self, request: AnswerRequest) -> Result<AnswerOutcome> {
        let started = Instant::now();
        if let Some(shortcut) = find_shortcut(&request.question) {
            return Ok(self.shortcut_outcome(shortcut, &request.question, started));
        }

        let plan = self.prepare(&request, started).await?;
        let generation_started = Instant::now();
        let mut generated = self
            .generate_answer(&plan.prompt, plan.template, plan.preferred.as_deref())
            .await?;

        let mut retried = false;
        if self.config.validation_policy == ValidationPolicy::RetryOnce
            && generated.value.1.has_unrepaired_errors()
        {
            warn!(
                provider = %generated.provider,
                issues = %generated.value.1.describe(),
                "Answer violates hard constraints, regenerating once"
            );
            retried = true;
            let first_errors = generated.value.1.unrepaired_errors().count();
            match self
                .generate_answer(&plan.prompt, plan.template, plan.preferred.as_deref())
                .await
            {
                Ok(mut second) => {
                    let usage = combined_usage(generated.usage, second.usage);
                    let cost = generated.cost_usd + second.cost_usd;
                    if second.value.1.unrepaired_errors().count() < first_errors {
                        second.usage = usage;
                        second.cost_usd = cost;
                        generated = second;
                    } else {
                        debug!("Regenerated answer was no better, keeping the first");
                        generated.usage = usage;
                        generated.cost_usd = cost;
                    }
                }
                Err(e) => warn!(error = %e, "Regeneration failed, keeping the first answer"),
            }
        }

        Ok(self.complete(plan, generated, retried, generation_started, started))
    }

    /// Answer a question as an event stream: `Context`, then `Partial`
    /// updates, then exactly one `Complete` or `Failed`.
    ///
    /// Classification and retrieval run before this returns, so their
    /// failures surface as `Err`. Only generation failures become `Failed`.
    #[instrument(skip(self, request), fields(question = %request.question))]
    pub async fn answer_stream(&self, request: AnswerRequest) -> Result<AnswerStream> {
        let started = Instant::now();
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let token = CancellationToken::new();

        if let Some(shortcut) = find_shortcut(&request.question) {
            let outcome = self.shortcut_outcome(shortcut, &request.question, started);
            // Fresh channel, capacity is free
            let _ = tx.try_send(AnswerEvent::Complete(Box::new(outcome)));
            return Ok(AnswerStream {
                events: rx,
                _cancel_on_drop: token.drop_guard(),
            });
        }

        let plan = self.prepare(&request, started).await?;

        let engine = self.clone();
        let task_token = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = task_token.cancelled() => debug!("Answer stream dropped by consumer"),
                _ = engine.drive_stream(plan, started, tx) => {}
            }
        });

        Ok(AnswerStream {
            events: rx,
            _cancel_on_drop: token.drop_guard(),
        })
    }

    async fn drive_stream(&self, plan: Plan, started: Instant, tx: mpsc::Sender<AnswerEvent>) {
        match self.stream_events(plan, started, &tx).await {
            Ok(()) => {}
            Err(TattvaError::Cancelled) => debug!("Answer stream cancelled"),
            Err(e) => {
                error!(error = %e, "Streaming answer failed");
                // Consumer may already be gone
                let _ = tx
                    .send(AnswerEvent::Failed {
                        message: e.to_string(),
                    })
                    .await;
            }
        }
    }

    async fn stream_events(
        &self,
        plan: Plan,
        started: Instant,
        tx: &mpsc::Sender<AnswerEvent>,
    ) -> Result<()> {
        let context = AnswerContext {
            classification: plan.classification.clone(),
            retrieval: plan.retrieval.clone(),
            template: plan.template,
            degraded: plan.degraded,
            evidence: evidence_summary(plan.template, &plan.retrieval.passages),
        };
        send(tx, AnswerEvent::Context(Box::new(context))).await?;

        let generation_started = Instant::now();
        let mut stream = self
            .chain
            .stream_structured(plan.prompt.clone(), plan.preferred.as_deref());
        while let Some(update) = stream.next_partial().await {
            send(tx, AnswerEvent::Partial(update)).await?;
        }
        let generated = stream.finish().await?;

        // Output already reached the consumer, so a bad final object is
        // terminal rather than a reason to fall back
        let (answer, report) = check_generated(plan.template, &generated.value)
            .map_err(|report| TattvaError::Schema(report.describe()))?;
        let generated = generated.map(|_| (answer, report));

        let outcome = self.complete(plan, generated, false, generation_started, started);
        send(tx, AnswerEvent::Complete(Box::new(outcome))).await
    }

    async fn prepare(&self, request: &AnswerRequest, started: Instant) -> Result<Plan> {
        let question = request.question.as_str();
        let preferred = self.preferred(request.preferred_provider.as_deref());
        let mut trace = Trace::new(question);

        let mut classification = match &request.classification {
            Some(c) => lock_to_registry(c.clone()),
            None => {
                let t = Instant::now();
                let c = self.classifier.classify(question, preferred.as_deref()).await;
                trace.classification_latency_ms = Some(elapsed_ms(t));
                c
            }
        };
        info!(
            category = %classification.category_id,
            name = %classification.category_name,
            template = %classification.template,
            "Question classified"
        );

        let mut retrieval = match &request.retrieval {
            Some(r) => r.clone(),
            None => {
                let t = Instant::now();
                let r = self
                    .retriever
                    .retrieve(question, classification.category_id, request.filters.clone())
                    .await?;
                trace.retrieval_latency_ms = Some(elapsed_ms(t));
                r
            }
        };

        let (template, degraded) = apply_evidence_policy(classification.template, &mut retrieval);
        if degraded {
            warn!(
                category = %classification.category_id,
                "No passages retrieved, answering with a refusal"
            );
            classification.reasoning = zero_evidence_reasoning(classification.template);
            classification.should_answer = false;
        }

        debug!(
            evidence = %evidence_summary(template, &retrieval.passages),
            elapsed_ms = elapsed_ms(started),
            "Context prepared"
        );

        trace.classification_result = Some((&classification).into());
        trace.expanded_query = retrieval.expanded_query.clone();
        trace.retrieval_results = Some(retrieval.clone());

        let prompt = answer_prompt(
            template,
            question,
            &classification.category_name,
            &retrieval.passages,
        );

        Ok(Plan {
            trace,
            classification,
            retrieval,
            template,
            degraded,
            prompt,
            preferred,
        })
    }

    /// One pass through the chain. Output that fails the template schema
    /// after repair counts as that provider failing.
    async fn generate_answer(
        &self,
        prompt: &StructuredPrompt,
        template: TemplateType,
        preferred: Option<&str>,
    ) -> Result<Generated<(Answer, ValidationReport)>> {
        self.chain
            .generate_validated(prompt, preferred, |value| {
                check_generated(template, &value)
                    .map_err(|report| TattvaError::Schema(report.describe()))
            })
            .await
    }

    fn complete(
        &self,
        plan: Plan,
        generated: Generated<(Answer, ValidationReport)>,
        retried: bool,
        generation_started: Instant,
        started: Instant,
    ) -> AnswerOutcome {
        let Generated {
            value: (answer, report),
            provider,
            model,
            usage,
            cost_usd,
            failed_attempts,
        } = generated;

        if report.valid {
            debug!("Answer passed validation");
        } else if report.has_unrepaired_errors() {
            warn!(template = %plan.template, issues = %report.describe(), "Answer failed validation");
        } else {
            info!(template = %plan.template, "Answer repaired");
        }

        let mut trace = plan.trace;
        trace.generation_result = Some(GenerationTrace {
            provider,
            model,
            template_used: plan.template,
            citations_in_answer: answer.citations().to_vec(),
            answer: answer.clone(),
            usage,
            cost_usd,
            validation: report.summary(),
            degraded: plan.degraded,
            failed_providers: failed_attempts.into_iter().map(|f| f.provider).collect(),
            retried,
        });
        trace.generation_latency_ms = Some(elapsed_ms(generation_started));
        trace.total_latency_ms = elapsed_ms(started);

        info!(
            trace_id = %trace.trace_id,
            template = %plan.template,
            total_ms = trace.total_latency_ms,
            cost_usd,
            "Answer complete"
        );
        self.recorder.record(trace.clone());

        AnswerOutcome {
            trace,
            full_response: answer,
            validation: report,
            degraded: plan.degraded,
        }
    }

    fn shortcut_outcome(&self, shortcut: Shortcut, question: &str, started: Instant) -> AnswerOutcome {
        let kind = shortcut.kind();
        let answer = shortcut.answer();
        info!(kind = ?kind, "Answered from shortcut table");

        // Static answers are curated, not generated
        let report = ValidationReport {
            valid: true,
            ..Default::default()
        };

        let mut trace = Trace::new(question);
        trace.shortcut = Some(kind);
        trace.generation_result = Some(GenerationTrace {
            provider: SHORTCUT_PROVIDER.to_string(),
            model: shortcut_table(kind).to_string(),
            template_used: answer.template_type(),
            citations_in_answer: Vec::new(),
            answer: answer.clone(),
            usage: TokenUsage::default(),
            cost_usd: 0.0,
            validation: report.summary(),
            degraded: false,
            failed_providers: Vec::new(),
            retried: false,
        });
        trace.total_latency_ms = elapsed_ms(started);
        self.recorder.record(trace.clone());

        AnswerOutcome {
            trace,
            full_response: answer,
            validation: report,
            degraded: false,
        }
    }
}

/// Decide the template actually used for generation.
///
/// A non-refusal template with zero passages is forced to T3 (returns
/// `degraded = true`). Fewer than the minimum passages only adds a
/// warning.
pub fn apply_evidence_policy(
    template: TemplateType,
    retrieval: &mut RetrievalResult,
) -> (TemplateType, bool) {
    if template.is_refusal() {
        return (template, false);
    }
    let count = retrieval.passages.len();
    if count == 0 {
        return (TemplateType::T3, true);
    }
    if count < MIN_EVIDENCE_PASSAGES {
        retrieval.push_warning(format!(
            "Only {} passages retrieved (fewer than {} needed for a well-supported answer)",
            count, MIN_EVIDENCE_PASSAGES
        ));
    }
    (template, false)
}

fn zero_evidence_reasoning(template: TemplateType) -> String {
    format!(
        "No passages retrieved for a {} category; refusing instead of answering without evidence",
        template
    )
}

fn shortcut_table(kind: ShortcutKind) -> &'static str {
    match kind {
        ShortcutKind::Etymology => "etymology-table",
        ShortcutKind::Metadata => "metadata-table",
    }
}

fn combined_usage(a: TokenUsage, b: TokenUsage) -> TokenUsage {
    TokenUsage::new(a.input_tokens + b.input_tokens, a.output_tokens + b.output_tokens)
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

async fn send(tx: &mpsc::Sender<AnswerEvent>, event: AnswerEvent) -> Result<()> {
    tx.send(event).await.map_err(|_| TattvaError::Cancelled)
}
