use acc_pmo::adapters::geojson_layer::{
    buffers_to_feature_collection, perimeter_to_feature_collection, write_feature_collection,
};
use acc_pmo::adapters::tabular::{export_result_table, read_participants_file};
use acc_pmo::core::perimeter::{count_in_range, DEFAULT_CIRCLE_SEGMENTS};
use acc_pmo::utils::error::{AccError, ErrorSeverity};
use acc_pmo::utils::{logger, validation::Validate};
use acc_pmo::{
    check_perimeter, open_layer_source, CliConfig, Command, ComplianceEngine, Crs, Evaluation,
    GeoPoint, PerimeterReport, PerimeterRule, RegulationConfig,
};
use anyhow::Context;
use clap::Parser;

fn main() {
    let config = CliConfig::parse();

    logger::init_logger(config.verbose, config.log_json);

    tracing::info!("Starting acc-pmo");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(exit_code(e.severity()));
    }

    let outcome = match &config.command {
        Command::Evaluate {
            lon,
            lat,
            layer,
            regulation,
            csv,
            buffers_geojson,
            json,
        } => run_evaluate(
            GeoPoint::new(*lon, *lat),
            layer,
            regulation.as_deref(),
            csv.as_deref(),
            buffers_geojson.as_deref(),
            *json,
        ),
        Command::Perimeter {
            participants,
            diameter_km,
            poi,
            geojson,
            json,
        } => run_perimeter(
            participants,
            *diameter_km,
            poi.as_deref(),
            geojson.as_deref(),
            *json,
        ),
    };

    if let Err(e) = outcome {
        match e.downcast_ref::<AccError>() {
            Some(acc_error) => {
                tracing::error!(
                    "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
                    e,
                    acc_error.category(),
                    acc_error.severity()
                );
                tracing::error!("💡 Recovery suggestion: {}", acc_error.recovery_suggestion());
                eprintln!("❌ {}", acc_error.user_friendly_message());
                eprintln!("💡 {}", acc_error.recovery_suggestion());

                let code = exit_code(acc_error.severity());
                if code > 0 {
                    std::process::exit(code);
                }
            }
            None => {
                tracing::error!("❌ Run failed: {:#}", e);
                eprintln!("❌ {:#}", e);
                std::process::exit(exit_code(ErrorSeverity::Critical));
            }
        }
    }
}

fn exit_code(severity: ErrorSeverity) -> i32 {
    match severity {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn run_evaluate(
    point: GeoPoint,
    layer_path: &str,
    regulation_path: Option<&str>,
    csv_path: Option<&str>,
    buffers_path: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let regulation = match regulation_path {
        Some(path) => RegulationConfig::from_file(path)?,
        None => RegulationConfig::default(),
    };
    regulation.validate()?;
    tracing::info!("Regulation: {}", regulation.regulation.name);

    let source = open_layer_source(layer_path)?;
    tracing::info!("Loading {}", source.describe());
    let layer = source.load_layer()?.to_crs(Crs::Lambert93)?;

    let engine = ComplianceEngine::from_provider(&regulation);
    let evaluation = engine.run(&point, &layer)?;

    if let Some(path) = csv_path {
        export_result_table(path, &evaluation.table)
            .with_context(|| format!("writing result table to {}", path))?;
        tracing::info!("📁 Result table saved to: {}", path);
    }
    if let Some(path) = buffers_path {
        let collection = buffers_to_feature_collection(&evaluation.buffers)?;
        write_feature_collection(path, &collection)
            .with_context(|| format!("writing buffers to {}", path))?;
        tracing::info!("📁 Buffers saved to: {}", path);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&evaluation)?);
    } else {
        print_evaluation(&evaluation);
    }
    Ok(())
}

fn print_evaluation(evaluation: &Evaluation) {
    println!(
        "Point ({}, {}) evaluated in {}",
        evaluation.origin.lon, evaluation.origin.lat, evaluation.table.crs
    );
    println!(
        "{:<12} {:>10} {:>11} {:>6} {:>14}",
        "buffer", "radius_m", "intersects", "count", "min_dist_m"
    );
    for row in evaluation.table.iter() {
        let distance = row
            .min_distance_m
            .map(|d| format!("{:.1}", d))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<12} {:>10} {:>11} {:>6} {:>14}",
            row.buffer, row.radius_m, row.intersects, row.count, distance
        );
    }
    println!("Status: {}", evaluation.status);
}

fn run_perimeter(
    participants_path: &str,
    diameter_km: f64,
    poi_path: Option<&str>,
    geojson_path: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let participants = read_participants_file(participants_path)?;
    let rule = PerimeterRule::from_diameter_km(diameter_km)?;
    let report = check_perimeter(&participants, rule)?;

    let poi_in_range = match poi_path {
        Some(path) => {
            let layer = open_layer_source(path)?.load_layer()?.to_crs(Crs::Wgs84)?;
            let points: Vec<GeoPoint> = layer
                .features
                .iter()
                .filter_map(|f| match &f.geometry {
                    Some(geo::Geometry::Point(p)) => Some(GeoPoint::new(p.x(), p.y())),
                    _ => None,
                })
                .collect();
            let count = count_in_range(&report.center, report.limit_km, &points);
            tracing::info!("{} of {} points of interest in range", count, points.len());
            Some(count)
        }
        None => None,
    };

    if let Some(path) = geojson_path {
        let collection = perimeter_to_feature_collection(&report, DEFAULT_CIRCLE_SEGMENTS)?;
        write_feature_collection(path, &collection)
            .with_context(|| format!("writing perimeter to {}", path))?;
        tracing::info!("📁 Perimeter saved to: {}", path);
    }

    if json {
        let output = serde_json::json!({
            "report": report,
            "poi_in_range": poi_in_range,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_report(&report, poi_in_range);
    }
    Ok(())
}

fn print_report(report: &PerimeterReport, poi_in_range: Option<usize>) {
    println!(
        "Centre ({:.5}, {:.5}), D={} km",
        report.center.lon, report.center.lat, report.diameter_km
    );
    for placement in &report.placements {
        println!(
            "{:>4} {:<24} {:<9} {:>8.3} km {}",
            placement.id,
            placement.name,
            placement.kind,
            placement.distance_km,
            if placement.inside { "inside" } else { "OUTSIDE" }
        );
    }
    if let Some(count) = poi_in_range {
        println!("Points of interest within D/2: {}", count);
    }
    println!("{}", report);
}
