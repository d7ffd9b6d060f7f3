//! orbview binary: interactive 3D scene viewer.

use std::path::Path;

use orbview::demo::DemoScene;
use orbview::options::Options;
use orbview::viewer::Viewer;

/// Options from a preset name (`production`, `test`) or a TOML file path.
fn resolve_options(input: &str) -> Result<Options, String> {
    if let Some(options) = Options::preset(input) {
        return Ok(options);
    }
    let path = Path::new(input);
    if path.exists() {
        return Options::load(path).map_err(|e| e.to_string());
    }
    Err(format!(
        "not a preset (production, test) or options file: {input}"
    ))
}

fn main() {
    env_logger::init();

    let options = match std::env::args().nth(1) {
        Some(arg) => match resolve_options(&arg) {
            Ok(options) => options,
            Err(e) => {
                log::error!("{e}");
                log::error!("Usage: orbview [production | test | <options.toml>]");
                std::process::exit(1);
            }
        },
        None => Options::production(),
    };

    let result = Viewer::builder()
        .with_scene(DemoScene::sample())
        .with_options(options)
        .build()
        .run();
    if let Err(e) = result {
        log::error!("{e}");
        std::process::exit(1);
    }
}
