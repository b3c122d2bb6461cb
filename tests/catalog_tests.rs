use glam::Vec3;
use starfield_renderer::catalog::{Catalog, DEFAULT_WORLD_SCALE};
use starfield_renderer::star::StarColor;
use std::io::Write;

fn write_catalog(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write catalog");
    file
}

#[test]
fn test_load_catalog_from_file() {
    let file = write_catalog(
        "source_id,x,y,z,stellar_radius,colour,temperature,lifestage\n\
         42,10.0,0.0,-10.0,1.2,0.4,5900,Main Sequence\n\
         43,-10.0,0.0,10.0,0.8,2.9,3400,Giant\n",
    );

    let catalog = Catalog::load(file.path()).expect("catalog should load");
    assert_eq!(catalog.stars.len(), 2);
    assert_eq!(catalog.stars[0].source_id, 42);
    assert_eq!(catalog.stars[0].color, StarColor::White);
    assert_eq!(catalog.stars[1].color, StarColor::Red);
}

#[test]
fn test_load_missing_file_is_an_error() {
    let err = Catalog::load("/nonexistent/stars.csv").unwrap_err();
    assert!(err.to_string().contains("stars.csv"));
}

#[test]
fn test_uppercase_headers_with_padding() {
    let file = write_catalog(
        " Source_ID , X , Y , Z ,Stellar_Radius, Colour ,Temperature,Lifestage\n\
         7, 1.0 , 2.0 , 3.0 ,1.0,0.1,6000,Main Sequence\n",
    );

    let catalog = Catalog::load(file.path()).expect("catalog should load");
    assert_eq!(catalog.stars.len(), 1);
    assert_eq!(catalog.stars[0].position, Vec3::new(1.0, 2.0, 3.0));
}

#[test]
fn test_incomplete_rows_are_skipped_not_fatal() {
    let file = write_catalog(
        "source_id,x,y,z,stellar_radius,colour,temperature,lifestage\n\
         1,1.0,1.0,1.0,1.0,0.5,5800,Main Sequence\n\
         ,2.0,2.0,2.0,1.0,0.5,5800,Main Sequence\n\
         2,3.0,,3.0,1.0,0.5,5800,Main Sequence\n\
         3,-1.0,-1.0,-1.0,,,,\n",
    );

    let catalog = Catalog::load(file.path()).expect("catalog should load");
    let ids: Vec<u64> = catalog.stars.iter().map(|s| s.source_id).collect();
    assert_eq!(ids, vec![1, 3]);
    // Row 3 has no color data at all and falls back to white.
    assert_eq!(catalog.stars[1].color, StarColor::White);
}

#[test]
fn test_instances_center_and_scale_positions() {
    let file = write_catalog(
        "source_id,x,y,z,stellar_radius,colour,temperature,lifestage\n\
         1,1.0,0.0,0.0,1.0,0.5,5800,Main Sequence\n\
         2,-1.0,0.0,0.0,1.0,0.5,5800,Main Sequence\n",
    );

    let catalog = Catalog::load(file.path()).expect("catalog should load");
    assert_eq!(catalog.center(), Vec3::ZERO);

    let instances = catalog.instances(DEFAULT_WORLD_SCALE);
    assert_eq!(instances.len(), 2);
    assert_eq!(instances[0].center(), Vec3::new(100.0, 0.0, 0.0));
    assert_eq!(instances[1].center(), Vec3::new(-100.0, 0.0, 0.0));

    // world_position agrees with the instance layout.
    assert_eq!(
        catalog.world_position(0, DEFAULT_WORLD_SCALE),
        instances[0].center()
    );
}

#[test]
fn test_empty_catalog_has_zero_bounds() {
    let file = write_catalog("source_id,x,y,z,stellar_radius,colour,temperature,lifestage\n");
    let catalog = Catalog::load(file.path()).expect("catalog should load");
    assert!(catalog.stars.is_empty());
    assert_eq!(catalog.min, Vec3::ZERO);
    assert_eq!(catalog.max, Vec3::ZERO);
    assert_eq!(catalog.center(), Vec3::ZERO);
}
