//! Recipe entity: caller-supplied description of one installation.

use super::{CommandSpec, Placeholders};
use crate::error::InstallResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How to install one piece of software
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// Logical name, also used for log files and reports
    pub name: String,
    /// Version string, available as `{version}`
    #[serde(default)]
    pub version: Option<String>,
    /// Where the software comes from
    #[serde(default)]
    pub source: Source,
    /// Fail when the extraction directory cannot be resolved
    #[serde(default = "default_require_dir")]
    pub require_dir: bool,
    /// Fixed extraction directory name, used when resolution yields nothing
    #[serde(default)]
    pub dir: Option<String>,
    /// Build steps, run in order inside the source directory
    #[serde(default)]
    pub build: Vec<BuildStep>,
    /// Skip the recipe when this probe reports the software present
    #[serde(default)]
    pub skip_if: Option<Probe>,
    /// Entries contributed to the generated settings file
    #[serde(default)]
    pub exports: Vec<SettingEntry>,
}

fn default_require_dir() -> bool {
    true
}

impl Recipe {
    /// Create an archive recipe with no build steps
    pub fn archive(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            version: None,
            source: Source::Archive {
                url: url.to_string(),
            },
            require_dir: true,
            dir: None,
            build: Vec::new(),
            skip_if: None,
            exports: Vec::new(),
        }
    }

    /// Add a build step from an argv list
    pub fn step<I, S>(mut self, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.build.push(BuildStep::new(argv));
        self
    }

    /// Placeholders for this recipe layered over the layout values
    pub fn placeholders(&self, base: &Placeholders) -> Placeholders {
        let mut vars = base.with("name", self.name.clone());
        if let Some(version) = &self.version {
            vars.set("version", version.clone());
        }
        vars
    }
}

/// Origin of a recipe's files
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Source {
    /// Archive downloaded into the workspace and unpacked there
    Archive { url: String },
    /// Single file downloaded into a layout directory
    File {
        url: String,
        /// Destination directory; defaults to the workspace
        #[serde(default)]
        dest: Option<String>,
        /// Mark the downloaded file executable
        #[serde(default)]
        executable: bool,
    },
    /// Version-control checkout, updated when already present
    Checkout {
        vcs: Vcs,
        url: String,
        /// Checkout directory
        dest: String,
    },
    /// Build steps only, run in the workspace
    #[default]
    None,
}

/// Supported version-control systems
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Vcs {
    Git,
    Svn,
}

/// One build command
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildStep {
    /// Program and arguments
    pub argv: Vec<String>,
    /// Extra environment variables
    #[serde(default)]
    pub env: Vec<EnvVar>,
    /// Working subdirectory, relative to the source directory
    #[serde(default)]
    pub dir: Option<String>,
}

impl BuildStep {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            env: Vec::new(),
            dir: None,
        }
    }

    /// Resolve into a command descriptor running under `base_dir`
    pub fn to_command(&self, base_dir: &Path, vars: &Placeholders) -> InstallResult<Option<CommandSpec>> {
        let argv = vars.expand_all(&self.argv)?;
        let Some(mut cmd) = CommandSpec::from_argv(&argv) else {
            return Ok(None);
        };

        let dir = match &self.dir {
            Some(sub) => base_dir.join(vars.expand(sub)?),
            None => base_dir.to_path_buf(),
        };
        cmd = cmd.current_dir(dir);
        for var in &self.env {
            cmd = cmd.env(var.name.clone(), vars.expand(&var.value)?);
        }
        Ok(Some(cmd))
    }
}

impl std::fmt::Display for BuildStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.argv.join(" "))
    }
}

/// Environment variable for a build step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

/// Capability check gating a recipe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Probe {
    /// Program can be started and does not exit with 127
    Command { argv: Vec<String> },
    /// `python -c "import <module>"` succeeds
    PythonImport { module: String },
    /// Path exists
    Path { path: String },
}

/// Section of the generated settings file
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Executables,
    Libraries,
    Genomes,
    Workflow,
}

impl Section {
    /// Header as written in the settings file
    pub fn header(&self) -> &'static str {
        match self {
            Self::Executables => "Executables",
            Self::Libraries => "Libraries",
            Self::Genomes => "Genomes",
            Self::Workflow => "Workflow",
        }
    }
}

/// One `key = value` entry of the generated settings file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SettingEntry {
    pub section: Section,
    pub key: String,
    pub value: String,
}

impl SettingEntry {
    pub fn new(section: Section, key: &str, value: &str) -> Self {
        Self {
            section,
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_step_expansion() {
        let mut vars = Placeholders::new();
        vars.set("prefix", "/opt/p");
        let mut step = BuildStep::new(["./configure", "--prefix={prefix}"]);
        step.env.push(EnvVar {
            name: "R_LIBS".into(),
            value: "{prefix}/lib/R".into(),
        });
        step.dir = Some("src".into());

        let cmd = step
            .to_command(Path::new("/tmp/ws/R-2.15.0"), &vars)
            .unwrap()
            .unwrap();
        assert_eq!(cmd.program, "./configure");
        assert_eq!(cmd.args, vec!["--prefix=/opt/p"]);
        assert_eq!(cmd.cwd.as_deref(), Some(Path::new("/tmp/ws/R-2.15.0/src")));
        assert_eq!(cmd.env, vec![("R_LIBS".to_string(), "/opt/p/lib/R".to_string())]);
    }

    #[test]
    fn test_empty_step_is_skipped() {
        let step = BuildStep::new(Vec::<String>::new());
        let cmd = step
            .to_command(Path::new("/tmp"), &Placeholders::new())
            .unwrap();
        assert!(cmd.is_none());
    }

    #[test]
    fn test_recipe_placeholders_include_version() {
        let mut recipe = Recipe::archive("bwa", "http://x.org/bwa-{version}.tar.bz2");
        recipe.version = Some("0.7.5a".into());
        let vars = recipe.placeholders(&Placeholders::new());
        assert_eq!(
            vars.expand("http://x.org/bwa-{version}.tar.bz2").unwrap(),
            "http://x.org/bwa-0.7.5a.tar.bz2"
        );
        assert_eq!(vars.get("name"), Some("bwa"));
    }

    #[test]
    fn test_section_order() {
        let mut sections = vec![Section::Workflow, Section::Executables, Section::Genomes];
        sections.sort();
        assert_eq!(
            sections,
            vec![Section::Executables, Section::Genomes, Section::Workflow]
        );
    }
}
