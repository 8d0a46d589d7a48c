use grid_defence_core::{CellCoord, CellRect, CellRectSize};
use grid_defence_system_path_generation::{
    is_overlap_free, Config, PathGenerator, PathRequest, RouteMetrics,
};
use proptest::prelude::*;

fn playable(width: u32, height: u32) -> CellRect {
    CellRect::from_origin_and_size(CellCoord::new(0, 0), CellRectSize::new(width, height))
}

#[test]
fn wide_grid_reaches_sixty_percent_of_turn_budget() {
    let generator = PathGenerator::new(Config {
        max_turns: 16,
        ..Config::default()
    });
    let request = PathRequest {
        bounds: playable(64, 64),
        entry: CellCoord::new(2, 30),
        exit: CellCoord::new(61, 30),
    };

    for seed in [1_u64, 7, 42] {
        let generated = generator.generate(&request, seed);
        assert!(!generated.fallback, "seed {seed} fell back to a direct connector");
        assert!(
            generated.turns >= 10,
            "seed {seed} produced only {} turns",
            generated.turns
        );
        assert!(generated.turns <= 16, "seed {seed} exceeded the turn budget");
    }
}

#[test]
fn generated_route_connects_entry_to_exit() {
    let generator = PathGenerator::default();
    let request = PathRequest {
        bounds: playable(48, 32),
        entry: CellCoord::new(0, 16),
        exit: CellCoord::new(47, 16),
    };

    let generated = generator.generate(&request, 99);
    assert_eq!(generated.route.first(), Some(&request.entry));
    assert_eq!(generated.route.last(), Some(&request.exit));
    assert_eq!(
        generated
            .route
            .iter()
            .filter(|cell| **cell == request.exit)
            .count(),
        1,
        "exit must only be reached at the end"
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn routes_hold_geometric_invariants(
        seed in any::<u64>(),
        width in 24_u32..64,
        height in 24_u32..64,
        max_turns in 4_u32..16,
    ) {
        let config = Config { max_turns, ..Config::default() };
        let generator = PathGenerator::new(config);
        let request = PathRequest {
            bounds: playable(width, height),
            entry: CellCoord::new(0, height / 2),
            exit: CellCoord::new(width - 1, height / 3),
        };

        let generated = generator.generate(&request, seed);
        let metrics = RouteMetrics::measure(&generated.route);
        prop_assert!(metrics.is_some(), "consecutive cells must be neighbours");
        let metrics = metrics.unwrap();

        prop_assert!(is_overlap_free(&generated.route));
        prop_assert!(generated.route.iter().all(|cell| request.bounds.contains(*cell)));
        prop_assert_eq!(metrics.turns, generated.turns);

        if generated.fallback {
            prop_assert!(metrics.turns <= 1);
        } else {
            prop_assert!(metrics.turns >= config.min_turns());
            prop_assert!(metrics.turns <= config.max_turns);
            prop_assert!(metrics.short_segments(config.min_segment) <= 1);
        }
    }
}
