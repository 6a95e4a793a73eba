use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use minijinja::{Environment, ErrorKind};
use tracing::debug;

use crate::error::PmError;
use crate::template::PromptTemplate;

/// Template extensions picked up by [`PromptManager::load_dir`].
const TEMPLATE_EXTENSIONS: &[&str] = &["j2", "jinja"];

/// Built-in templates, compiled into the binary.
const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    (
        "agent/system",
        include_str!("../templates/agent/system.j2"),
    ),
    ("agent/turn", include_str!("../templates/agent/turn.j2")),
];

/// Manages prompt templates and renders them with context variables.
///
/// Block tags trim the newline that follows them, so templates can put
/// `{% if %}` / `{% for %}` on their own lines without leaking blank lines
/// into the rendered prompt.
#[derive(Debug)]
pub struct PromptManager {
    env: Environment<'static>,
    names: BTreeSet<String>,
}

impl PromptManager {
    /// Create a manager preloaded with the built-in templates.
    ///
    /// # Errors
    ///
    /// Returns `PmError::InvalidTemplate` if a built-in template fails to parse.
    pub fn new() -> Result<Self, PmError> {
        let mut pm = Self::empty();
        for (name, source) in BUILTIN_TEMPLATES {
            pm.add_template(PromptTemplate::new(*name, *source))?;
        }
        Ok(pm)
    }

    /// Create a manager with no templates registered.
    pub fn empty() -> Self {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        Self {
            env,
            names: BTreeSet::new(),
        }
    }

    /// Load all `.j2` / `.jinja` templates below a directory.
    ///
    /// Template names are the path relative to `dir` without the extension,
    /// using `/` as separator, so `dir/agent/turn.j2` overrides the built-in
    /// `agent/turn`. Returns the number of templates loaded.
    ///
    /// # Errors
    ///
    /// Returns `PmError::Io` if the directory cannot be read, or
    /// `PmError::InvalidTemplate` if a template fails to parse.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, PmError> {
        let mut loaded = 0;
        self.load_dir_inner(dir, dir, &mut loaded)?;
        debug!(dir = %dir.display(), loaded, "loaded prompt templates");
        Ok(loaded)
    }

    fn load_dir_inner(&mut self, root: &Path, dir: &Path, loaded: &mut usize) -> Result<(), PmError> {
        let mut entries = fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort();

        for path in entries {
            if path.is_dir() {
                self.load_dir_inner(root, &path, loaded)?;
                continue;
            }

            let is_template = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| TEMPLATE_EXTENSIONS.contains(&ext));
            if !is_template {
                continue;
            }

            let Some(name) = template_name(root, &path) else {
                continue;
            };
            let source = fs::read_to_string(&path)?;
            self.add_template(PromptTemplate::new(name, source))?;
            *loaded += 1;
        }

        Ok(())
    }

    /// Register a single template, replacing any template with the same name.
    ///
    /// # Errors
    ///
    /// Returns `PmError::InvalidTemplate` if the source fails to parse.
    pub fn add_template(&mut self, template: PromptTemplate) -> Result<(), PmError> {
        let PromptTemplate { name, source } = template;
        self.env
            .add_template_owned(name.clone(), source)
            .map_err(|e| PmError::InvalidTemplate(format!("{name}: {e}")))?;
        self.names.insert(name);
        Ok(())
    }

    /// Render a template by name with the given context.
    ///
    /// # Errors
    ///
    /// Returns `PmError::TemplateNotFound` for an unknown name and
    /// `PmError::RenderError` if evaluation fails.
    pub fn render(&self, name: &str, ctx: &serde_json::Value) -> Result<String, PmError> {
        let template = self.env.get_template(name).map_err(|e| match e.kind() {
            ErrorKind::TemplateNotFound => PmError::TemplateNotFound(name.to_owned()),
            _ => PmError::InvalidTemplate(format!("{name}: {e}")),
        })?;

        template
            .render(ctx)
            .map_err(|e| PmError::RenderError(format!("{name}: {e}")))
    }

    /// Returns whether a template with this name is registered.
    pub fn has_template(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Names of all registered templates, sorted.
    pub fn list_templates(&self) -> Vec<String> {
        self.names.iter().cloned().collect()
    }
}

/// `root/a/b.j2` -> `a/b`
fn template_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?.with_extension("");
    let parts = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}
