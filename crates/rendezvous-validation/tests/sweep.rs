use rendezvous_milp::PlanError;
use rendezvous_validation::{sweep, GeneratorConfig, InstanceGenerator, SweepRow};

fn assert_sound(rows: Vec<SweepRow>) {
    for row in rows {
        match &row.result {
            Ok((_, violations)) => assert!(
                violations.is_empty(),
                "instance {} failed validation: {violations:?}",
                row.instance
            ),
            // seat counts guarantee a routing, so only the time limit may stop a solve
            Err(PlanError::OracleTimeout) => {}
            Err(err) => panic!("instance {} failed: {err}", row.instance),
        }
    }
}

#[test]
fn per_driver_plans_are_sound() {
    assert_sound(sweep(InstanceGenerator::new(42), 4).collect());
}

#[test]
fn global_plans_are_sound() {
    let config = GeneratorConfig {
        global_capacity: true,
        ..GeneratorConfig::default()
    };
    assert_sound(sweep(InstanceGenerator::with_config(5, config), 4).collect());
}

#[test]
fn rows_render_as_csv() {
    let row = sweep(InstanceGenerator::new(1), 1).next().unwrap();
    let columns = SweepRow::HEADER.split(',').count();
    assert_eq!(row.to_csv().split(',').count(), columns);
}
