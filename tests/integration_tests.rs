use std::fs;

use assert_approx_eq::assert_approx_eq;
use geo_mapper::config::{load_sql_conf_for, CONFIG_FILE};
use geo_mapper::geocoder::nominatim::NominatimGeocoder;
use geo_mapper::geocoder::{GeocodeError, Geocoder};
use geo_mapper::mapper::memory::InMemoryMapper;
use geo_mapper::mapper::sql::SqlMapper;
use geo_mapper::mapper::{Mapper, Row};
use geo_mapper::service::{dispatch, GeoRequest, GeoResponse};
use geo_mapper::Point;
use tempfile::tempdir;
use url::Url;

const CITIES: [(&str, f64, f64); 6] = [
    ("London", 51.5074, -0.1278),
    ("Oxford", 51.7520, -1.2577),
    ("Cambridge", 52.2053, 0.1218),
    ("Brighton", 50.8225, -0.1372),
    ("Paris", 48.8566, 2.3522),
    ("Edinburgh", 55.9533, -3.1883),
];

fn sorted_labels(rows: &[Row]) -> Vec<String> {
    let mut labels: Vec<String> = rows
        .iter()
        .map(|r| r.columns["label"].as_str().unwrap_or_default().to_string())
        .collect();
    labels.sort();
    labels
}

#[test]
fn integration_sql_mapper_from_config_file() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("points.db");
    fs::create_dir_all(dir.path().join("config")).unwrap();
    fs::write(
        dir.path().join(CONFIG_FILE),
        format!(
            "[test]\ndriver = \"sqlite\"\nopenStr = \"{}\"\ntable = \"cities\"\nlatCol = \"latitude\"\nlngCol = \"longitude\"\n",
            db_path.display()
        ),
    )
    .unwrap();

    let conf = load_sql_conf_for(dir.path(), "test").unwrap();
    let sql = SqlMapper::open(conf).unwrap();
    sql.ensure_table().unwrap();

    let mut memory = InMemoryMapper::default();
    for (name, lat, lng) in CITIES {
        let point = Point::new(lat, lng);
        sql.insert(&point, Some(name)).unwrap();
        memory.push(Row::new(point).with_column("label", name));
    }

    let london = Point::new(51.5074, -0.1278);
    let backends: Vec<Box<dyn Mapper>> = vec![Box::new(sql), Box::new(memory)];
    for radius in [10.0, 100.0, 400.0, 1_000.0] {
        let expected: Vec<String> = {
            let mut names: Vec<String> = CITIES
                .iter()
                .filter(|(_, lat, lng)| london.great_circle_distance(&Point::new(*lat, *lng)) <= radius)
                .map(|(name, _, _)| name.to_string())
                .collect();
            names.sort();
            names
        };
        for backend in &backends {
            let rows = backend.points_within_radius(&london, radius).unwrap();
            assert_eq!(sorted_labels(&rows), expected, "radius {radius}");
        }
    }
}

#[test]
fn integration_dispatch_over_swappable_backends() {
    let geocoder = NominatimGeocoder::new(|url: &Url| -> Result<Vec<u8>, GeocodeError> {
        if url.path().ends_with("search.php") {
            Ok(br#"[{"lat":"51.5","lon":"-0.12"}]"#.to_vec())
        } else {
            Ok(br#"{"address":{"city":"London","country_code":"gb"}}"#.to_vec())
        }
    })
    .unwrap();

    let point = geocoder.geocode("London").unwrap();
    assert_eq!(point, Point::new(51.5, -0.12));

    let mapper = InMemoryMapper::new(
        CITIES
            .iter()
            .map(|(name, lat, lng)| Row::new(Point::new(*lat, *lng)).with_column("label", *name))
            .collect(),
    );

    let req: GeoRequest = serde_json::from_value(serde_json::json!({
        "kind": "within_radius",
        "origin": point,
        "radius_km": 100.0,
    }))
    .unwrap();
    match dispatch(req, Some(&mapper), &geocoder) {
        GeoResponse::WithinRadius { rows } => {
            assert_eq!(
                sorted_labels(&rows),
                vec!["Brighton", "Cambridge", "London", "Oxford"]
            );
        }
        other => panic!("unexpected response {other:?}"),
    }

    let req: GeoRequest = serde_json::from_str(r#"{"kind":"reverse_geocode","point":{"lat":51.5,"lng":-0.12}}"#).unwrap();
    match dispatch(req, Some(&mapper), &geocoder) {
        GeoResponse::ReverseGeocode { address } => assert_eq!(address, "London gb"),
        other => panic!("unexpected response {other:?}"),
    }
}

#[test]
fn integration_projection_then_radius_query() {
    let origin = Point::new(50.0, -4.0);
    let rows: Vec<Row> = (0..8)
        .map(|i| {
            let bearing = i as f64 * 45.0;
            Row::new(origin.point_at_distance_and_bearing(100.0, bearing)).with_column("label", i)
        })
        .collect();
    for row in &rows {
        assert_approx_eq!(origin.great_circle_distance(&row.point), 100.0, 1e-6);
    }

    let mapper = InMemoryMapper::new(rows);
    assert_eq!(mapper.points_within_radius(&origin, 100.001).unwrap().len(), 8);
    assert!(mapper.points_within_radius(&origin, 99.999).unwrap().is_empty());
}
