// Viewer configuration: command line parsing and the resulting settings

use std::path::{Path, PathBuf};

use clap::Parser;

/// Default name of the persisted state file inside the resources directory.
pub const STATE_FILE_NAME: &str = "program_state.txt";

/// Optional parts of the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    /// Screen-space blur toggled with B/U.
    pub blur: bool,
    /// Camera-mounted spotlight toggled with L/N.
    pub spotlight: bool,
    /// Painting on the wall, movable with the arrow keys.
    pub painting: bool,
    /// Debug panel toggled with F11.
    pub debug_panel: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            blur: true,
            spotlight: true,
            painting: true,
            debug_panel: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub resources: PathBuf,
    pub state_file: PathBuf,
    pub load_state: bool,
    pub save_state: bool,
    pub features: Features,
    pub window_size: (u32, u32),
    pub msaa_samples: u32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        let resources = PathBuf::from("resources");
        Self {
            state_file: resources.join(STATE_FILE_NAME),
            resources,
            load_state: true,
            save_state: true,
            features: Features::default(),
            window_size: (800, 600),
            msaa_samples: 4,
        }
    }
}

impl ViewerConfig {
    pub fn builder() -> ViewerConfigBuilder {
        ViewerConfigBuilder::default()
    }

    /// Resolves a path relative to the resources directory.
    pub fn asset(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.resources.join(relative)
    }
}

#[derive(Debug, Default)]
pub struct ViewerConfigBuilder {
    config: ViewerConfig,
    state_file: Option<PathBuf>,
}

impl ViewerConfigBuilder {
    pub fn resources(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.resources = dir.into();
        self
    }

    /// Overrides the state file; otherwise it lives in the resources directory.
    pub fn state_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_file = Some(path.into());
        self
    }

    pub fn load_state(mut self, enabled: bool) -> Self {
        self.config.load_state = enabled;
        self
    }

    pub fn save_state(mut self, enabled: bool) -> Self {
        self.config.save_state = enabled;
        self
    }

    pub fn features(mut self, features: Features) -> Self {
        self.config.features = features;
        self
    }

    pub fn window_size(mut self, width: u32, height: u32) -> Self {
        self.config.window_size = (width.max(1), height.max(1));
        self
    }

    pub fn msaa_samples(mut self, samples: u32) -> Self {
        self.config.msaa_samples = samples;
        self
    }

    pub fn build(self) -> ViewerConfig {
        let mut config = self.config;
        config.state_file = self
            .state_file
            .unwrap_or_else(|| config.resources.join(STATE_FILE_NAME));
        config
    }
}

/// Walk through a lit, textured tea room.
#[derive(Debug, Parser)]
#[command(name = "tearoom-3d", version)]
pub struct Cli {
    /// Directory holding `objects/` and `textures/`
    #[arg(long, default_value = "resources")]
    pub resources: PathBuf,

    /// State file (defaults to <resources>/program_state.txt)
    #[arg(long)]
    pub state_file: Option<PathBuf>,

    /// Do not restore the saved state at startup
    #[arg(long)]
    pub no_load_state: bool,

    /// Do not save the state on exit
    #[arg(long)]
    pub no_save_state: bool,

    /// Disable the blur post-process
    #[arg(long)]
    pub no_blur: bool,

    /// Disable the camera spotlight
    #[arg(long)]
    pub no_spotlight: bool,

    /// Leave the painting out of the scene
    #[arg(long)]
    pub no_painting: bool,

    /// Disable the debug panel
    #[arg(long)]
    pub no_panel: bool,

    #[arg(long, default_value_t = 800)]
    pub width: u32,

    #[arg(long, default_value_t = 600)]
    pub height: u32,

    /// Multisample count for the scene pass (1 or 4)
    #[arg(long, default_value_t = 4, value_parser = parse_samples)]
    pub msaa: u32,

    /// Log filter, e.g. "debug" or "tearoom_3d=trace"
    #[arg(long)]
    pub log: Option<String>,
}

fn parse_samples(value: &str) -> Result<u32, String> {
    match value.parse::<u32>() {
        Ok(samples @ (1 | 4)) => Ok(samples),
        Ok(other) => Err(format!("{other} samples not supported, use 1 or 4")),
        Err(e) => Err(e.to_string()),
    }
}

impl Cli {
    pub fn into_config(self) -> ViewerConfig {
        let mut builder = ViewerConfig::builder()
            .resources(self.resources)
            .load_state(!self.no_load_state)
            .save_state(!self.no_save_state)
            .features(Features {
                blur: !self.no_blur,
                spotlight: !self.no_spotlight,
                painting: !self.no_painting,
                debug_panel: !self.no_panel,
            })
            .window_size(self.width, self.height)
            .msaa_samples(self.msaa);
        if let Some(path) = self.state_file {
            builder = builder.state_file(path);
        }
        builder.build()
    }
}
