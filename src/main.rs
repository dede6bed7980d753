use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use geojson_purge::inventory::{mergeable_values, property_keys_with_samples};
use geojson_purge::plan::{
    LayerSelection, MergeConfig, PlanConfig, PropertySelection, DEFAULT_MERGE_KEY,
};
use geojson_purge::sanitize::DEFAULT_DECIMAL_PLACES;
use geojson_purge::{load_collection, run, save_collection};
use humantime::format_duration;
use tracing::{warn, Level};

fn cli() -> Command {
    Command::new("geojson-purge")
        .version("0.1.0")
        .author("Jesper Fjellin")
        .about("Cleans up GeoJSON exports from CAD drawings")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log every dissolved group"),
        )
        .subcommand(
            Command::new("inspect")
                .about("Lists mergeable values and attribute names")
                .arg(Arg::new("input").required(true).value_parser(value_parser!(PathBuf)))
                .arg(
                    Arg::new("key")
                        .long("key")
                        .default_value(DEFAULT_MERGE_KEY)
                        .help("Attribute to group features by"),
                ),
        )
        .subcommand(
            Command::new("process")
                .about("Runs the requested operations and writes a new file")
                .arg(Arg::new("input").required(true).value_parser(value_parser!(PathBuf)))
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_parser(value_parser!(PathBuf))
                        .help("Output file (defaults to <input>-processed.geojson)"),
                )
                .arg(
                    Arg::new("plan")
                        .long("plan")
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON file describing the operations; flags override it"),
                )
                .arg(
                    Arg::new("merge-key")
                        .long("merge-key")
                        .help("Attribute to group features by when merging"),
                )
                .arg(
                    Arg::new("merge")
                        .long("merge")
                        .action(ArgAction::Append)
                        .conflicts_with("merge-all")
                        .help("Merge the features carrying this value (repeatable)"),
                )
                .arg(
                    Arg::new("merge-all")
                        .long("merge-all")
                        .action(ArgAction::SetTrue)
                        .help("Merge every value carried by two or more features"),
                )
                .arg(
                    Arg::new("delete")
                        .long("delete")
                        .action(ArgAction::Append)
                        .conflicts_with("keep")
                        .help("Delete this attribute from every feature (repeatable)"),
                )
                .arg(
                    Arg::new("keep")
                        .long("keep")
                        .action(ArgAction::Append)
                        .help("Delete every attribute except this one (repeatable)"),
                )
                .arg(
                    Arg::new("remove-z")
                        .long("remove-z")
                        .action(ArgAction::SetTrue)
                        .help("Drop the Z ordinate from every position"),
                )
                .arg(
                    Arg::new("truncate")
                        .long("truncate")
                        .num_args(0..=1)
                        .default_missing_value(DEFAULT_DECIMAL_PLACES.to_string())
                        .value_parser(value_parser!(u32))
                        .help(format!(
                            "Round coordinates to N decimal places (default {DEFAULT_DECIMAL_PLACES})"
                        )),
                )
                .arg(
                    Arg::new("pretty")
                        .long("pretty")
                        .action(ArgAction::SetTrue)
                        .help("Indent the output"),
                ),
        )
}

fn main() -> Result<()> {
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("inspect", sub)) => {
            init_logging(sub);
            inspect(sub)
        }
        Some(("process", sub)) => {
            init_logging(sub);
            process(sub)
        }
        Some((name, _)) => bail!("unknown subcommand {name}"),
        None => bail!("no subcommand given"),
    }
}

fn init_logging(matches: &ArgMatches) {
    let level = if matches.get_flag("verbose") {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn input_path(matches: &ArgMatches) -> Result<&PathBuf> {
    matches
        .get_one::<PathBuf>("input")
        .context("no input file given")
}

fn inspect(matches: &ArgMatches) -> Result<()> {
    let input = input_path(matches)?;
    let key = matches
        .get_one::<String>("key")
        .map_or(DEFAULT_MERGE_KEY, String::as_str);

    let collection = load_collection(input)
        .with_context(|| format!("Could not read {}", input.display()))?;

    println!("Values of {key} shared by two or more features:");
    let values = mergeable_values(&collection, key);
    if values.is_empty() {
        println!("  (none)");
    }
    for (value, count) in values {
        println!("  {value}: {count} features");
    }

    println!("Attributes:");
    for (name, sample) in property_keys_with_samples(&collection) {
        println!("  {name} (e.g. {sample})");
    }
    Ok(())
}

/// Read the plan file if one was given and lay the command line flags over it
fn build_plan(matches: &ArgMatches) -> Result<PlanConfig> {
    let mut plan = match matches.get_one::<PathBuf>("plan") {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Could not read plan {}", path.display()))?;
            PlanConfig::from_json(&text)
                .with_context(|| format!("Invalid plan {}", path.display()))?
        }
        None => PlanConfig::default(),
    };

    let values: Vec<String> = strings(matches, "merge");
    if matches.get_flag("merge-all") || !values.is_empty() {
        let merge = plan.merge.get_or_insert_with(MergeConfig::default);
        merge.layers = if values.is_empty() {
            LayerSelection::All
        } else {
            LayerSelection::Values(values)
        };
    }
    if let Some(key) = matches.get_one::<String>("merge-key") {
        match plan.merge.as_mut() {
            Some(merge) => merge.key = key.clone(),
            None => warn!("--merge-key given without anything to merge, ignoring it"),
        }
    }

    let delete = strings(matches, "delete");
    let keep = strings(matches, "keep");
    if !delete.is_empty() {
        plan.delete_properties = Some(PropertySelection::Keys(delete));
    } else if !keep.is_empty() {
        plan.delete_properties = Some(PropertySelection::AllExcept(keep));
    }

    if matches.get_flag("remove-z") {
        plan.remove_z = true;
    }
    if let Some(n) = matches.get_one::<u32>("truncate") {
        plan.truncate = Some(*n);
    }

    Ok(plan)
}

fn strings(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

fn process(matches: &ArgMatches) -> Result<()> {
    let start = Instant::now();
    let input = input_path(matches)?;
    let output = matches
        .get_one::<PathBuf>("output")
        .cloned()
        .unwrap_or_else(|| processed_path(input));

    let plan = build_plan(matches)?;
    if plan.is_empty() {
        println!("No operation requested, nothing written");
        return Ok(());
    }

    let collection = load_collection(input)
        .with_context(|| format!("Could not read {}", input.display()))?;
    let operations = plan.resolve(&collection);
    let (collection, report) = run(collection, &operations)
        .with_context(|| format!("Could not process {}", input.display()))?;
    for step in &report.steps {
        println!("{step}");
    }

    save_collection(&output, &collection, matches.get_flag("pretty"))
        .with_context(|| format!("Could not write {}", output.display()))?;

    let before = fs::metadata(input)?.len();
    let after = fs::metadata(&output)?.len();
    println!("Written to {}", output.display());
    println!("Size before: {}", natural_size(before));
    println!("Size after:  {}", natural_size(after));
    if before > 0 {
        let reduction = 100.0 * (before as f64 - after as f64) / before as f64;
        println!("Reduced by {reduction:.1}%");
    }

    let elapsed = Duration::from_millis(start.elapsed().as_millis() as u64);
    println!("Done in {}", format_duration(elapsed));
    Ok(())
}

/// `drawing.geojson` becomes `drawing-processed.geojson` next to it
fn processed_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}-processed.geojson"))
}

fn natural_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["kB", "MB", "GB", "TB"];
    if bytes < 1000 {
        return format!("{bytes} B");
    }
    let mut size = bytes as f64;
    let mut unit = "B";
    for next in UNITS {
        if size < 1000.0 {
            break;
        }
        size /= 1000.0;
        unit = next;
    }
    format!("{size:.1} {unit}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn output_name_follows_input() {
        assert_eq!(
            processed_path(Path::new("/data/site/drawing.geojson")),
            PathBuf::from("/data/site/drawing-processed.geojson")
        );
        assert_eq!(
            processed_path(Path::new("drawing.json")),
            PathBuf::from("drawing-processed.geojson")
        );
    }

    #[test]
    fn sizes_use_decimal_units() {
        assert_eq!(natural_size(512), "512 B");
        assert_eq!(natural_size(1_500), "1.5 kB");
        assert_eq!(natural_size(2_000_000), "2.0 MB");
    }

    #[test]
    fn flags_override_plan_defaults() {
        let matches = cli()
            .try_get_matches_from([
                "geojson-purge",
                "process",
                "in.geojson",
                "--merge",
                "fence",
                "--merge-key",
                "Type",
                "--keep",
                "Type",
                "--truncate",
            ])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        let plan = build_plan(sub).unwrap();
        assert_eq!(
            plan,
            PlanConfig {
                merge: Some(MergeConfig {
                    key: "Type".to_string(),
                    layers: LayerSelection::Values(vec!["fence".to_string()]),
                }),
                delete_properties: Some(PropertySelection::AllExcept(vec!["Type".to_string()])),
                remove_z: false,
                truncate: Some(DEFAULT_DECIMAL_PLACES),
            }
        );
    }

    #[test]
    fn bare_truncate_uses_the_library_default() {
        for args in [
            &["geojson-purge", "process", "in.geojson", "--truncate"][..],
            &["geojson-purge", "process", "in.geojson", "--truncate", "3"][..],
        ] {
            let matches = cli().try_get_matches_from(args).unwrap();
            let (_, sub) = matches.subcommand().unwrap();
            let expected = if args.len() == 4 {
                DEFAULT_DECIMAL_PLACES
            } else {
                3
            };
            assert_eq!(build_plan(sub).unwrap().truncate, Some(expected));
        }
    }

    #[test]
    fn no_flags_means_no_work() {
        let matches = cli()
            .try_get_matches_from(["geojson-purge", "process", "in.geojson"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        assert!(build_plan(sub).unwrap().is_empty());
    }
}
