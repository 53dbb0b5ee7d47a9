use std::path::PathBuf;

use flow_viewer::{flow, viewer::ViewerConfig};

fn main() -> anyhow::Result<()> {
    let models: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    let config = if models.is_empty() {
        ViewerConfig::default()
    } else {
        ViewerConfig {
            models,
            ..Default::default()
        }
    };
    flow::run(config)
}
