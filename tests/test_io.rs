use std::path::PathBuf;

use halomatch::core::domain::{CatalogHeader, Halo};
use halomatch::error::{CacheError, ConfigError};
use halomatch::io::cache::{load_matches, read_matches, save_matches, write_matches, CandidateTables};
use halomatch::io::catalog_file::{load_catalog, save_catalog, CatalogFile};
use halomatch::io::config::RunConfig;
use halomatch::io::report::{read_match_report, write_match_report, ReportInfo};
use halomatch::matcher::{Candidate, MatchParams, MatchStrategy};
use halomatch::HaloMatcher;
use nalgebra::Point3;

use crate::common::{catalog, halo};

mod common;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("halomatch-{}-{}", std::process::id(), name))
}

fn cand(target: usize, goodness: f64) -> Candidate {
    Candidate { target, goodness }
}

/// Three primary lists (one empty), two secondary lists (one empty).
fn sample_tables() -> CandidateTables {
    CandidateTables {
        primary_best: vec![vec![cand(0, 80.0), cand(1, 79.95)], vec![], vec![cand(0, 12.5)]],
        secondary_best: vec![vec![cand(2, 100.0)], vec![]],
    }
}

fn encode(tables: &CandidateTables) -> Vec<u8> {
    let mut buf = Vec::new();
    write_matches(tables, &mut buf).expect("write failed");
    buf
}

fn expect_invalid(bytes: &[u8]) {
    match read_matches(&mut &bytes[..]) {
        Err(CacheError::InvalidFormat(_)) => {}
        other => panic!("expected InvalidFormat, got {:?}", other),
    }
}

// --- Match Cache ---

#[test]
fn test_cache_preserves_lists_and_empty_entries() {
    let tables = sample_tables();
    let bytes = encode(&tables);
    // header + 5 * (4 + 8) index bytes + 4 records
    assert_eq!(bytes.len(), 24 + 60 + 4 * 16);
    assert_eq!(&bytes[0..7], b"HMCACHE");

    let back = read_matches(&mut bytes.as_slice()).expect("read failed");
    assert_eq!(back, tables);
}

#[test]
fn test_cache_of_empty_catalogs() {
    let tables = CandidateTables::default();
    let bytes = encode(&tables);
    assert_eq!(bytes.len(), 24);
    assert_eq!(read_matches(&mut bytes.as_slice()).expect("read failed"), tables);
}

#[test]
fn test_cache_rejects_bad_magic() {
    let mut bytes = encode(&sample_tables());
    bytes[0] = b'X';
    expect_invalid(&bytes);
}

#[test]
fn test_cache_rejects_other_version() {
    let mut bytes = encode(&sample_tables());
    bytes[7] = 9;
    match read_matches(&mut bytes.as_slice()) {
        Err(CacheError::VersionMismatch { expected: 1, found: 9 }) => {}
        other => panic!("expected VersionMismatch, got {:?}", other),
    }
}

#[test]
fn test_cache_rejects_inconsistent_offsets() {
    let mut bytes = encode(&sample_tables());
    // Primary start offsets follow the 3 u32 lengths; the second should be 2
    let second_start = 24 + 3 * 4 + 8;
    assert_eq!(bytes[second_start], 2);
    bytes[second_start] = 1;
    expect_invalid(&bytes);
}

#[test]
fn test_cache_rejects_truncation_and_trailing_bytes() {
    let bytes = encode(&sample_tables());
    expect_invalid(&bytes[..bytes.len() - 1]);
    expect_invalid(&bytes[..10]);

    let mut padded = bytes.clone();
    padded.push(0);
    expect_invalid(&padded);
}

#[test]
fn test_cache_rejects_out_of_range_records() {
    let mut tables = sample_tables();
    tables.primary_best[0][0].target = 2; // only two secondary halos
    expect_invalid(&encode(&tables));

    let mut tables = sample_tables();
    tables.secondary_best[0][0].goodness = 100.5;
    expect_invalid(&encode(&tables));
}

#[test]
fn test_cache_rejects_huge_halo_count() {
    let mut bytes = encode(&CandidateTables::default());
    bytes[8..16].copy_from_slice(&u64::MAX.to_le_bytes());
    expect_invalid(&bytes);
}

#[test]
fn test_cached_resolution_matches_fresh_run() {
    let primary = common::random_catalog(41, 80, 200);
    let secondary = common::random_catalog(42, 90, 200);
    let matcher = HaloMatcher::new(MatchParams {
        mass_offset: 3.0,
        max_displacement: 50.0,
        ..Default::default()
    });

    let fresh = matcher.run(&primary, &secondary, None);
    let path = temp_path("resolve.cache");
    save_matches(
        &CandidateTables {
            primary_best: fresh.primary_best.clone(),
            secondary_best: fresh.secondary_best.clone(),
        },
        &path,
    )
    .expect("save failed");

    let cached = matcher
        .resolve_cached(&path, &primary, &secondary, None)
        .expect("cached resolution failed");
    assert_eq!(cached.table, fresh.table);

    // Swapped catalogs no longer fit the cache
    let err = matcher.resolve_cached(&path, &secondary, &primary, None);
    let _ = std::fs::remove_file(&path);
    match err {
        Err(CacheError::CatalogMismatch {
            expected_primary: 90,
            found_primary: 80,
            ..
        }) => {}
        other => panic!("expected CatalogMismatch, got {:?}", other.map(|o| o.stats)),
    }
}

#[test]
fn test_load_missing_cache_is_io_error() {
    let path = temp_path("does-not-exist.cache");
    assert!(matches!(load_matches(&path), Err(CacheError::Io(_))));
}

// --- ASCII Report ---

#[test]
fn test_report_lists_matches_after_commented_header() {
    let primary = catalog(vec![
        halo(7, 2.0e12, [10.0; 3], &[(1, 10)]),
        halo(3, 1.0e12, [60.0; 3], &[(2, 10)]),
    ]);
    let secondary = catalog(vec![
        halo(70, 2.0e12, [10.0; 3], &[(1, 10)]),
        halo(30, 1.0e12, [60.0; 3], &[(2, 10)]),
        halo(99, 9.0e12, [90.0; 3], &[(5, 10)]),
    ]);
    let params = MatchParams {
        mass_offset: 1.5,
        strategy: MatchStrategy::SinglePass,
        ..Default::default()
    };
    let outcome = HaloMatcher::new(params.clone()).run(&primary, &secondary, None);

    let info = ReportInfo {
        primary_input: PathBuf::from("a.json"),
        secondary_input: PathBuf::from("b.json"),
        grid_resolution: 256,
        params,
    };
    let mut buf = Vec::new();
    write_match_report(&mut buf, &info, &primary, &secondary, &outcome.table).expect("write failed");

    let text = String::from_utf8(buf.clone()).expect("report is not UTF-8");
    assert!(text.contains("# Mass offset: 1.5"));
    assert!(text.contains("# Initial volume grid: 256"));
    assert!(text.contains("# Found matches: 2"));

    let rows = read_match_report(buf.as_slice()).expect("read failed");
    assert_eq!(rows.len(), 2);
    // Mass order: the lighter halo (id 3) comes first
    assert_eq!((rows[0].primary_id, rows[0].secondary_id), (3, 30));
    assert_eq!((rows[1].primary_id, rows[1].secondary_id), (7, 70));
    assert_eq!(rows[1].primary_mass, 2.0e12);
    assert!(rows.iter().all(|r| r.goodness == 100.0));
}

// --- Run Config ---

#[test]
fn test_config_defaults_fill_in() {
    let config: RunConfig = serde_json::from_str(
        r#"{ "primary_catalog": "a.json", "secondary_catalog": "b.json", "grid_resolution": 128 }"#,
    )
    .expect("parse failed");

    config.validate().expect("defaults should validate");
    assert_eq!(config.threads, 4);
    assert!(!config.load_cache && !config.save_cache);
    assert_eq!(config.params.mass_offset, 5.0);
    assert_eq!(config.params.tie_tolerance, 0.1);
    assert!(config.params.max_displacement.is_infinite());
    assert_eq!(config.params.strategy, MatchStrategy::TwoPass);
}

#[test]
fn test_config_partial_params_keep_other_defaults() {
    let config: RunConfig = serde_json::from_str(
        r#"{
            "primary_catalog": "a.json",
            "secondary_catalog": "b.json",
            "grid_resolution": 64,
            "params": { "mass_offset": 2.5, "strategy": "SinglePass" }
        }"#,
    )
    .expect("parse failed");

    assert_eq!(config.params.mass_offset, 2.5);
    assert_eq!(config.params.min_goodness, 0.0);
    assert_eq!(config.params.strategy, MatchStrategy::SinglePass);
}

#[test]
fn test_config_validation_names_the_bad_parameter() {
    let base: RunConfig = serde_json::from_str(
        r#"{ "primary_catalog": "a.json", "secondary_catalog": "b.json", "grid_resolution": 16 }"#,
    )
    .expect("parse failed");

    let check = |config: RunConfig, expected: &str| match config.validate() {
        Err(ConfigError::Invalid { name, .. }) => assert_eq!(name, expected),
        other => panic!("expected Invalid({}), got {:?}", expected, other),
    };

    let mut c = base.clone();
    c.params.mass_offset = 0.5;
    check(c, "mass_offset");

    let mut c = base.clone();
    c.params.max_displacement = 0.0;
    check(c, "max_displacement");

    let mut c = base.clone();
    c.params.min_goodness = 100.0;
    check(c, "min_goodness");

    let mut c = base.clone();
    c.grid_resolution = 0;
    check(c, "grid_resolution");

    let mut c = base.clone();
    c.save_cache = true;
    check(c, "cache_path");

    let mut c = base;
    c.save_cache = true;
    c.cache_path = Some(PathBuf::from("run.cache"));
    assert!(c.validate().is_ok());
}

// --- Catalog Bundles ---

#[test]
fn test_catalog_bundle_sorts_and_counts_particles() {
    let bundle = CatalogFile {
        header: CatalogHeader::cubic(3, 50.0),
        halos: vec![
            Halo::new(1, 5.0, Point3::new(1.0, 2.0, 3.0)).with_particles(vec![0, 1]),
            Halo::new(2, 1.0, Point3::new(4.0, 5.0, 6.0)).with_particles(vec![2]),
            Halo::new(3, 3.0, Point3::new(7.0, 8.0, 9.0)).with_particles(vec![3, 4, 5]),
        ],
        reference_positions: (0..6).map(|i| Point3::new(i as f64, 0.0, 0.0)).collect(),
    };

    let path = temp_path("bundle.json");
    save_catalog(&bundle, &path).expect("save failed");
    let loaded = load_catalog(&path);
    let _ = std::fs::remove_file(&path);

    let (catalog, snapshot) = loaded.expect("load failed").into_parts();
    assert!(catalog.is_mass_sorted());
    let ids: Vec<_> = catalog.halos.iter().map(|h| h.id).collect();
    assert_eq!(ids, vec![Some(2), Some(3), Some(1)]);
    assert_eq!(catalog.halos[1].num_particles, 3);
    assert_eq!(catalog.halos[2].position, Point3::new(1.0, 2.0, 3.0));
    assert_eq!(snapshot.positions.len(), 6);
    assert_eq!(catalog.box_size().x, 50.0);
}

#[test]
fn test_sort_by_id_puts_placeholders_last() {
    let mut c = catalog(vec![
        halo(9, 1.0, [0.0; 3], &[]),
        halo(4, 2.0, [0.0; 3], &[]),
        halo(6, 3.0, [0.0; 3], &[]),
    ]);
    assert_eq!(c.remove(1), Some(4));
    assert_eq!(c.remove(1), None);

    c.sort_by_id();
    let ids: Vec<_> = c.halos.iter().map(|h| h.id).collect();
    assert_eq!(ids, vec![Some(6), Some(9), None]);

    c.sort_by_mass();
    assert!(c.is_mass_sorted());
    assert_eq!(c.halos[1].mass, 2.0);
}
