extern crate log;
pub mod control;
pub mod engine;
pub mod geofile;
pub mod geometry;
pub mod labels;
pub mod overlay;
pub mod style;
use crate::control::controller::{LoadOptions, MapController, Outcome};
use crate::engine::adapter::{DrawPlugin, MapEngine};
use crate::engine::memory::InMemoryMap;
use crate::geofile::feature::FeatureId;
use crate::labels::tiers::{LabelTier, TierSet};
use anyhow::{anyhow, Context};
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::{fs::read_to_string, path::Path};

/// Apply polygon styling to a GeoJSON collection and render its overlays.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input config file.
    #[arg(short, long)]
    config_filepath: String,
}

/// A styling command. Applies to every polygon unless `ids` lists the features to select, as GeoJSON string or
/// number ids.
#[derive(Deserialize, Debug)]
enum StyleCommand {
    Fill {
        color: String,
        opacity: f64,
        ids: Option<Vec<FeatureId>>,
    },
    Stroke {
        color: String,
        width: f64,
        ids: Option<Vec<FeatureId>>,
    },
    Label {
        text: String,
        ids: Option<Vec<FeatureId>>,
    },
}

fn default_fit_bounds() -> bool {
    true
}

#[derive(Deserialize, Debug)]
struct Config {
    input_geojson: Option<PathBuf>,
    output_dir: PathBuf,
    #[serde(default = "default_fit_bounds")]
    fit_bounds: bool,
    tiers: Option<Vec<LabelTier>>,
    #[serde(default)]
    styles: Vec<StyleCommand>,
}

fn select(controller: &mut MapController<InMemoryMap>, ids: &[FeatureId]) {
    if let Some(engine) = controller.engine_mut() {
        engine.draw_mut().select(ids);
    }
}

fn run_style_command(
    controller: &mut MapController<InMemoryMap>,
    command: &StyleCommand,
) -> Outcome {
    match command {
        StyleCommand::Fill { color, opacity, ids } => match ids {
            Some(ids) => {
                select(controller, ids);
                controller.change_selected_fill(color, *opacity)
            }
            None => controller.change_all_fill(color, *opacity),
        },
        StyleCommand::Stroke { color, width, ids } => match ids {
            Some(ids) => {
                select(controller, ids);
                controller.change_selected_stroke(color, *width)
            }
            None => controller.change_all_stroke(color, *width),
        },
        StyleCommand::Label { text, ids } => match ids {
            Some(ids) => {
                select(controller, ids);
                controller.set_selected_text(text)
            }
            None => controller.set_all_text(text),
        },
    }
}

fn try_main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }

    let args = Args::try_parse()?;
    if !Path::new(&args.config_filepath).exists() {
        return Err(anyhow!("Config file {} not found", &args.config_filepath));
    }
    let config_contents = read_to_string(args.config_filepath)?;
    let config: Config = serde_yaml::from_str(&config_contents)?;

    let tiers = match config.tiers {
        Some(tiers) => TierSet::new(tiers)?,
        None => TierSet::default(),
    };
    let mut controller: MapController<InMemoryMap> = MapController::new(tiers);
    controller.mount(|| Ok(InMemoryMap::new()));

    if let Some(input_geojson) = &config.input_geojson {
        log::info!("Importing drawings from {:?}", input_geojson);
        controller.import_file(
            input_geojson,
            LoadOptions {
                fit_bounds: config.fit_bounds,
            },
        )?;
    }

    for command in config.styles.iter() {
        let outcome = run_style_command(&mut controller, command);
        log::info!("{:?}: {:?}", command, outcome);
    }

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Could not create {:?}", config.output_dir))?;
    let geojson_filepath = controller.export_file(&config.output_dir)?;
    log::info!("Wrote drawings to {:?}", geojson_filepath);

    let engine = controller
        .engine()
        .ok_or_else(|| anyhow!("Map is not mounted"))?;
    log::info!(
        "Draw plugin holds {} features",
        engine.draw().get_all().len()
    );
    if let Some(report) = controller.last_report() {
        log::info!("{:?}", report);
    }
    let style_filepath = config.output_dir.join("style.json");
    log::info!("Writing overlay style to {:?}", &style_filepath);
    std::fs::write(
        &style_filepath,
        serde_json::to_string_pretty(&engine.style_document()?)?,
    )?;
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = try_main() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1)
    }
}

#[cfg(test)]
mod tests {
    use geojson::{Geometry, Value};
    use serde_json::json;

    use super::{run_style_command, Config, StyleCommand};
    use crate::control::controller::{LoadOptions, MapController, Outcome};
    use crate::engine::memory::InMemoryMap;
    use crate::geofile::feature::{keys, Feature, FeatureId};
    use crate::labels::tiers::TierSet;

    fn square(id: FeatureId, offset: f64) -> geojson::Feature {
        Feature::new(
            id,
            Geometry::new(Value::Polygon(vec![vec![
                vec![offset, offset],
                vec![offset, offset + 1.0],
                vec![offset + 1.0, offset + 1.0],
                vec![offset, offset],
            ]])),
        )
        .into()
    }

    #[test]
    fn test_config_accepts_string_and_number_ids() {
        let config: Config = serde_yaml::from_str(
            r##"
output_dir: out
styles:
  - Fill:
      color: "#ff0000"
      opacity: 0.4
      ids: [7, "lote-2"]
  - Label:
      text: Lote
"##,
        )
        .unwrap();
        assert!(config.fit_bounds);
        assert!(config.tiers.is_none());
        match &config.styles[0] {
            StyleCommand::Fill { ids, .. } => assert_eq!(
                Some(vec![
                    FeatureId::Number(7u64.into()),
                    FeatureId::String("lote-2".to_string())
                ]),
                *ids
            ),
            other => panic!("Unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_style_command_selects_number_ids() {
        let mut controller: MapController<InMemoryMap> = MapController::new(TierSet::default());
        controller.mount(|| Ok(InMemoryMap::new()));
        controller.load_geojson(
            vec![
                square(FeatureId::Number(7u64.into()), 0.0),
                square(FeatureId::String("lote-2".to_string()), 5.0),
            ],
            LoadOptions::default(),
        );

        let command = StyleCommand::Fill {
            color: "#00ff00".to_string(),
            opacity: 0.6,
            ids: Some(vec![FeatureId::Number(7u64.into())]),
        };
        assert_eq!(
            Outcome::Applied(1),
            run_style_command(&mut controller, &command)
        );
        let styled = controller.store().get(&FeatureId::Number(7u64.into())).unwrap();
        assert_eq!(Some(&json!("#00ff00")), styled.properties.get(keys::FILL_COLOR));
        let untouched = controller
            .store()
            .get(&FeatureId::String("lote-2".to_string()))
            .unwrap();
        assert!(!untouched.has_property(keys::FILL_COLOR));
    }
}
