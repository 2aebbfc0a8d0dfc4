//! Per-run state handed to every stage.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::Span;

use crate::config::AnalysisConfig;
use crate::fetch::Source;

pub const CONFIG_FILE: &str = "config.yml";

/// File layout of one analysis directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Workspace { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Loads `config.yml` from the workspace root.
    pub fn load_config(&self) -> Result<AnalysisConfig> {
        let path = self.config_path();
        AnalysisConfig::load(&path)
            .with_context(|| format!("loading configuration from {}", path.display()))
    }

    /// `matrix{idx}.csv`, or its gzipped sibling when only that exists.
    pub fn matrix_path(&self, idx: usize) -> PathBuf {
        let plain = self.root.join(format!("matrix{idx}.csv"));
        let gz = self.root.join(format!("matrix{idx}.csv.gz"));
        if !plain.exists() && gz.exists() { gz } else { plain }
    }

    pub fn opportunities_path(&self) -> PathBuf {
        self.root.join("opportunities.csv")
    }

    pub fn demographics_path(&self) -> PathBuf {
        self.root.join("demographics.csv")
    }

    pub fn impact_area_path(&self) -> PathBuf {
        self.root.join("impact_area.csv")
    }

    pub fn metrics_path(&self, idx: usize) -> PathBuf {
        self.root.join(format!("metrics{idx}.csv"))
    }

    pub fn compared_path(&self) -> PathBuf {
        self.root.join("compared.csv")
    }

    pub fn summary_path(&self) -> PathBuf {
        self.root.join("summary.csv")
    }

    pub fn unreachable_path(&self) -> PathBuf {
        self.root.join("unreachable.csv")
    }

    pub fn validation_dir(&self) -> PathBuf {
        self.root.join("validation")
    }

    pub fn quality_path(&self) -> PathBuf {
        self.validation_dir().join("quality.json")
    }
}

/// Configuration, paths and the run span, created once in `main` (or a test)
/// and borrowed by each stage.
#[derive(Debug)]
pub struct RunContext {
    pub config: AnalysisConfig,
    pub workspace: Workspace,
    pub span: Span,
}

impl RunContext {
    pub fn new(config: AnalysisConfig, workspace: Workspace) -> Self {
        let span = tracing::info_span!("analysis", uid = %config.uid);
        RunContext {
            config,
            workspace,
            span,
        }
    }

    pub fn scenario_count(&self) -> usize {
        self.config.scenarios.len()
    }

    fn source(&self, configured: Option<&String>, default: PathBuf) -> Source {
        match configured {
            Some(raw) => Source::resolve(raw, self.workspace.root()),
            None => Source::Local(default),
        }
    }

    pub fn matrix_source(&self, idx: usize) -> Source {
        self.source(
            self.config.sources.matrices.get(idx),
            self.workspace.matrix_path(idx),
        )
    }

    pub fn opportunities_source(&self) -> Source {
        self.source(
            self.config.sources.opportunities.as_ref(),
            self.workspace.opportunities_path(),
        )
    }

    pub fn demographics_source(&self) -> Source {
        self.source(
            self.config.sources.demographics.as_ref(),
            self.workspace.demographics_path(),
        )
    }

    pub fn impact_area_source(&self) -> Source {
        self.source(
            self.config.sources.impact_area.as_ref(),
            self.workspace.impact_area_path(),
        )
    }
}
