use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, warn};

use super::error::GenerateError;
use super::llm::{ChatClient, LlmError, LlmFallback};
use super::schema::{RenderContext, TableSchema};
use super::templates::{RenderError, TemplateRenderer};
use crate::catalog::{ProviderStore, TemplateSpec, TemplateStore};
use crate::introspect::SchemaSource;
use crate::runtime_config::RuntimeConfig;
use crate::worker_pool::WorkerPool;

/// Failure that stops one generation unit from producing code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitError {
    /// The template body did not render
    Body(RenderError),
    /// The LLM prompt did not render
    Prompt(RenderError),
    /// The model provider could not produce code
    Llm(LlmError),
}

impl fmt::Display for UnitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitError::Body(err) => write!(
                f,
                "Error generating code from template {}: {}",
                err.template, err.cause
            ),
            UnitError::Prompt(err) => write!(
                f,
                "Error rendering prompt template {}: {}",
                err.template, err.cause
            ),
            UnitError::Llm(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for UnitError {}

/// What happened to one (table, template) unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitOutcome {
    /// Code was produced. `write_error` is set when the file could not be
    /// written; the code is still returned.
    Generated {
        code: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        write_error: Option<String>,
    },
    /// No code was produced
    Failed { error: String },
}

/// Result of one (table, template) unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationUnitResult {
    /// Template display name, or its file name when no display name is set
    pub template_name: String,
    /// Final artifact path (`root_path` + rendered relative path)
    pub path: String,
    /// Template root path as configured
    pub root_path: String,
    /// Rendered relative path
    pub relative_path: String,
    #[serde(flatten)]
    pub outcome: UnitOutcome,
}

impl GenerationUnitResult {
    pub fn code(&self) -> Option<&str> {
        match &self.outcome {
            UnitOutcome::Generated { code, .. } => Some(code),
            UnitOutcome::Failed { .. } => None,
        }
    }

    pub fn write_error(&self) -> Option<&str> {
        match &self.outcome {
            UnitOutcome::Generated { write_error, .. } => write_error.as_deref(),
            UnitOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            UnitOutcome::Failed { error } => Some(error),
            UnitOutcome::Generated { .. } => None,
        }
    }
}

/// All units generated for one table, in template-group order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableResult {
    pub table: String,
    pub files: Vec<GenerationUnitResult>,
}

/// One entry per requested table, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub results: Vec<TableResult>,
}

impl BatchResult {
    pub fn units(&self) -> impl Iterator<Item = &GenerationUnitResult> {
        self.results.iter().flat_map(|t| t.files.iter())
    }

    pub fn failed_units(&self) -> usize {
        self.units().filter(|u| u.error().is_some()).count()
    }
}

/// Where a unit's artifact goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub root_path: String,
    pub relative_path: String,
    pub full_path: String,
}

/// Join a root directory and a relative path, adding a separator to the
/// root when it lacks one.
pub fn join_output_path(root_path: &str, relative_path: &str) -> String {
    let mut full = root_path.to_string();
    if !full.is_empty() && !full.ends_with('/') && !full.ends_with('\\') {
        full.push('/');
    }
    full.push_str(relative_path);
    full
}

/// Create missing parent directories and overwrite the file.
fn write_artifact(path: &str, code: &str) -> std::io::Result<()> {
    let path = Path::new(path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, code)
}

/// Writes artifacts as units finish, one writer at a time per path.
///
/// Every path seen during the batch keeps its lock, so a second unit that
/// resolves to the same path is detected and waits for the first write.
#[derive(Default)]
struct ArtifactWriter {
    paths: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ArtifactWriter {
    /// Write `code` to `path`, returning the error message on failure.
    fn write(&self, path: &str, code: &str) -> Option<String> {
        let lock = {
            let mut paths = self.paths.lock().unwrap_or_else(PoisonError::into_inner);
            match paths.entry(path.to_string()) {
                Entry::Occupied(entry) => {
                    warn!(path, "output path produced by more than one unit, overwriting");
                    Arc::clone(entry.get())
                }
                Entry::Vacant(entry) => Arc::clone(entry.insert(Arc::default())),
            }
        };
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        match write_artifact(path, code) {
            Ok(()) => {
                debug!(path, "wrote artifact");
                None
            }
            Err(err) => {
                error!(path, error = %err, "failed to write file");
                Some(format!("Failed to write file {path}: {err}"))
            }
        }
    }
}

struct Unit<'s> {
    table_idx: usize,
    schema: &'s TableSchema,
    template: &'s TemplateSpec,
}

/// Runs template groups against table schemas.
///
/// Request-level preconditions (group exists and is non-empty, every table
/// introspects) are checked before any unit runs. After that, every unit
/// succeeds or fails on its own and the batch always completes.
pub struct Generator<'a> {
    templates: &'a dyn TemplateStore,
    providers: &'a dyn ProviderStore,
    chat: &'a dyn ChatClient,
    renderer: TemplateRenderer,
    config: RuntimeConfig,
}

impl<'a> Generator<'a> {
    pub fn new(
        templates: &'a dyn TemplateStore,
        providers: &'a dyn ProviderStore,
        chat: &'a dyn ChatClient,
    ) -> Self {
        Self {
            templates,
            providers,
            chat,
            renderer: TemplateRenderer::new(),
            config: RuntimeConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Generate every template of `group_id` for every table in `tables`.
    ///
    /// Each artifact is written as soon as its unit finishes. Units that
    /// resolve to the same path overwrite each other: in request and group
    /// order when running sequentially, in completion order otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error only for request-level failures: unknown group, empty
    /// group, or a table that fails to introspect. Unit failures are reported
    /// inside the returned [`BatchResult`].
    pub fn generate(
        &self,
        source: &dyn SchemaSource,
        tables: &[String],
        group_id: i64,
        use_llm: bool,
    ) -> Result<BatchResult, GenerateError> {
        let templates = self
            .templates
            .group_templates(group_id)
            .ok_or(GenerateError::GroupNotFound { group_id })?;
        if templates.is_empty() {
            return Err(GenerateError::EmptyGroup { group_id });
        }

        let schemas = tables
            .iter()
            .map(|table| source.table_schema(table))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            group_id,
            tables = schemas.len(),
            templates = templates.len(),
            use_llm,
            "starting generation batch"
        );

        let units: Vec<Unit<'_>> = schemas
            .iter()
            .enumerate()
            .flat_map(|(table_idx, schema)| {
                templates.iter().map(move |template| Unit {
                    table_idx,
                    schema,
                    template,
                })
            })
            .collect();

        let produced = self.produce_all(&units, use_llm);

        let mut results: Vec<TableResult> = schemas
            .iter()
            .map(|schema| TableResult {
                table: schema.table_name.clone(),
                files: Vec::with_capacity(templates.len()),
            })
            .collect();
        for (unit, result) in units.iter().zip(produced) {
            results[unit.table_idx].files.push(result);
        }

        let batch = BatchResult { results };
        info!(
            units = units.len(),
            failed = batch.failed_units(),
            "generation batch finished"
        );
        Ok(batch)
    }

    /// Run every unit and return the results in unit order.
    ///
    /// With more than one worker configured, template-path units run on the
    /// render pool while LLM-path units wait on their own pool.
    fn produce_all(&self, units: &[Unit<'_>], use_llm: bool) -> Vec<GenerationUnitResult> {
        let writer = ArtifactWriter::default();
        let parallel = self.config.workers > 1 || self.config.llm_workers > 1;
        if !parallel {
            return units
                .iter()
                .map(|u| self.produce(u, use_llm, &writer))
                .collect();
        }

        let (llm_idx, render_idx): (Vec<usize>, Vec<usize>) = (0..units.len())
            .partition(|&i| use_llm && units[i].template.has_prompt());
        let render_pool = WorkerPool::new("render", self.config.workers);
        let llm_pool = WorkerPool::new("llm", self.config.llm_workers);

        let (llm_done, render_done) = rayon::join(
            || llm_pool.map_ordered(&llm_idx, |&i| self.produce(&units[i], use_llm, &writer)),
            || render_pool.map_ordered(&render_idx, |&i| self.produce(&units[i], use_llm, &writer)),
        );

        let mut slots: Vec<Option<GenerationUnitResult>> = (0..units.len()).map(|_| None).collect();
        for (i, result) in llm_idx.into_iter().zip(llm_done) {
            slots[i] = Some(result);
        }
        for (i, result) in render_idx.into_iter().zip(render_done) {
            slots[i] = Some(result);
        }
        slots.into_iter().flatten().collect()
    }

    /// Generate one unit and write its artifact.
    fn produce(&self, unit: &Unit<'_>, use_llm: bool, writer: &ArtifactWriter) -> GenerationUnitResult {
        debug!(
            table = %unit.schema.table_name,
            template = unit.template.label(),
            "generating unit"
        );
        let path = self.resolve_output_path(unit.schema, unit.template);
        let outcome = match self.generate_code(unit.schema, unit.template, use_llm) {
            Ok(code) => {
                let write_error = writer.write(&path.full_path, &code);
                UnitOutcome::Generated { code, write_error }
            }
            Err(err) => {
                warn!(
                    table = %unit.schema.table_name,
                    template = unit.template.label(),
                    error = %err,
                    "generation unit failed"
                );
                UnitOutcome::Failed {
                    error: err.to_string(),
                }
            }
        };
        GenerationUnitResult {
            template_name: unit.template.label().to_string(),
            path: path.full_path,
            root_path: path.root_path,
            relative_path: path.relative_path,
            outcome,
        }
    }

    /// Produce the code for one unit: LLM path when requested and the
    /// template has a prompt, template rendering otherwise.
    pub fn generate_code(
        &self,
        schema: &TableSchema,
        template: &TemplateSpec,
        use_llm: bool,
    ) -> Result<String, UnitError> {
        if use_llm && template.has_prompt() {
            let ctx = RenderContext::for_prompt(schema);
            let prompt = self
                .renderer
                .render_prompt(&template.name, &template.prompt_text, &ctx)
                .map_err(UnitError::Prompt)?;
            return LlmFallback::new(self.providers, self.chat)
                .generate(&prompt)
                .map_err(UnitError::Llm);
        }
        if use_llm {
            debug!(template = %template.name, "template has no prompt, rendering it instead");
        }
        let ctx = RenderContext::new(schema);
        self.renderer
            .render_body(&template.name, &template.content, &ctx)
            .map_err(UnitError::Body)
    }

    /// Render the template's output path for a table.
    pub fn resolve_output_path(&self, schema: &TableSchema, template: &TemplateSpec) -> ResolvedPath {
        let ctx = RenderContext::new(schema);
        let relative_path = self
            .renderer
            .render_path(&template.relative_path_pattern, &ctx);
        ResolvedPath {
            full_path: join_output_path(&template.root_path, &relative_path),
            root_path: template.root_path.clone(),
            relative_path,
        }
    }
}

/// Render one stored template against a caller-supplied context, for
/// previewing a template outside batch generation.
pub fn render_single(
    store: &dyn TemplateStore,
    template_id: i64,
    context: &serde_json::Value,
) -> Result<String, GenerateError> {
    let template = store
        .template(template_id)
        .ok_or(GenerateError::TemplateNotFound { template_id })?;
    TemplateRenderer::new()
        .render_body(&template.name, &template.content, context)
        .map_err(|err| GenerateError::Render {
            template: err.template,
            cause: err.cause,
        })
}
