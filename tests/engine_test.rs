use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rgb_kmeans::assign::assign_samples;
use rgb_kmeans::update::update_centroids;
use rgb_kmeans::{
    default_config, AccumulationStrategy, CentroidTable, Color, Config, ConfigError, KMeans, Outcome, PixelGrid,
};

const BLACK: Color = Color::gray(0);
const WHITE: Color = Color::gray(255);

fn config(k: usize, threads: usize) -> Config {
    Config { k, num_threads: threads, ..default_config() }
}

fn black_and_white() -> PixelGrid {
    PixelGrid::from_colors(2, 2, vec![BLACK, BLACK, WHITE, WHITE]).expect("2x2 grid")
}

fn gradient(width: usize, height: usize) -> PixelGrid {
    PixelGrid::from_fn(width, height, |x, y| {
        Color::new((x * 1300) as u16, (y * 2000) as u16, ((x * y) % 7 * 9000) as u16)
    })
}

fn noise(width: usize, height: usize, seed: u64) -> PixelGrid {
    let mut rng = StdRng::seed_from_u64(seed);
    PixelGrid::from_fn(width, height, |_, _| {
        Color::new(rng.random_range(0..=255), rng.random_range(0..=255), rng.random_range(0..=255))
    })
}

#[test]
fn black_and_white_split_into_two_clusters() {
    for seed in 0..16 {
        for threads in [1, 4] {
            let cfg = Config { seed: Some(seed), ..config(2, threads) };
            let result = KMeans::new(cfg).run(black_and_white()).expect("valid config");
            assert!(result.is_converged(), "seed {seed} did not converge: {:?}", result.outcome);

            let mut centroids = result.centroids().to_vec();
            centroids.sort_by_key(|c| c.red);
            assert_eq!(centroids, vec![BLACK, WHITE], "seed {seed}");

            for sample in result.grid.samples() {
                let cluster = sample.cluster.expect("assigned");
                assert_eq!(result.centroids()[cluster], sample.color, "seed {seed}");
            }
        }
    }
}

#[test]
fn one_cluster_per_pixel_converges_on_first_pass() {
    let colors = vec![Color::new(0, 0, 0), Color::new(40, 50, 60), Color::new(70, 80, 90), Color::new(100, 0, 120)];
    let grid = PixelGrid::from_colors(2, 2, colors.clone()).expect("2x2 grid");
    let result = KMeans::new(config(4, 2)).run_with_centroids(grid, colors.clone()).expect("valid config");

    assert_eq!(result.outcome, Outcome::Converged { iterations: 1 });
    assert_eq!(result.centroids(), colors.as_slice());
    assert_eq!(result.grid.assignments(), vec![Some(0), Some(1), Some(2), Some(3)]);
}

#[test]
fn k_equal_to_pixel_count_with_random_start_labels_everything() {
    let grid = PixelGrid::from_colors(2, 2, vec![Color::new(0, 0, 0), Color::new(40, 50, 60), Color::new(70, 80, 90), Color::new(100, 0, 120)])
        .expect("2x2 grid");
    let result = KMeans::new(Config { seed: Some(3), ..config(4, 2) }).run(grid).expect("valid config");
    assert!(result.grid.assignments().iter().all(|c| matches!(c, Some(i) if *i < 4)));
    assert_eq!(result.table.total_count(), 4);
}

#[test]
fn identical_pixels_converge_immediately() {
    for color in [Color::new(0, 0, 0), Color::new(200, 100, 0), Color::new(65535, 65535, 65535)] {
        let grid = PixelGrid::from_fn(3, 3, |_, _| color);
        let result = KMeans::new(Config { seed: Some(11), ..config(5, 3) }).run(grid).expect("valid config");
        assert_eq!(result.outcome, Outcome::Converged { iterations: 1 }, "color {color:?}");
        assert!(result.centroids().iter().all(|c| *c == color));
        assert_eq!(result.history[0].update.empty, 4);
    }
}

#[test]
fn assignment_labels_every_pixel_and_counts_add_up() {
    let mut grid = noise(37, 23, 5);
    let mut rng = StdRng::seed_from_u64(9);
    for strategy in [AccumulationStrategy::PartialSums, AccumulationStrategy::ClusterLocks] {
        let mut table = CentroidTable::sample_from(&grid, 12, &mut rng);
        assign_samples(&mut grid, &mut table, 5, strategy);

        assert_eq!(table.total_count(), grid.len() as u64);
        for (i, acc) in table.accumulators().iter().enumerate() {
            let members = grid.samples().iter().filter(|s| s.cluster == Some(i)).count();
            assert_eq!(acc.count, members as u64);
        }
        assert!(grid.samples().iter().all(|s| matches!(s.cluster, Some(i) if i < 12)));
    }
}

#[test]
fn centroid_movement_shrinks_until_convergence() {
    let grid = PixelGrid::from_fn(3, 2, |x, y| Color::gray([[0, 10, 20], [100, 110, 120]][y][x]));
    let result = KMeans::new(config(2, 2))
        .run_with_centroids(grid, vec![Color::gray(0), Color::gray(10)])
        .expect("valid config");

    assert_eq!(result.outcome, Outcome::Converged { iterations: 3 });
    assert_eq!(result.centroids(), &[Color::gray(10), Color::gray(110)]);
    let shifts: Vec<u64> = result.history.iter().map(|p| p.update.max_shift).collect();
    assert_eq!(shifts, vec![3 * 62 * 62, 3 * 38 * 38, 0]);
    assert!(shifts.windows(2).all(|w| w[0] >= w[1]));
    assert_eq!(result.grid.assignments(), vec![Some(0), Some(0), Some(0), Some(1), Some(1), Some(1)]);
}

fn four_blobs() -> (PixelGrid, Vec<Color>) {
    let bases = vec![
        Color::new(8000, 8000, 8000),
        Color::new(50000, 9000, 12000),
        Color::new(10000, 45000, 30000),
        Color::new(60000, 60000, 20000),
    ];
    let grid = PixelGrid::from_fn(20, 20, |x, y| {
        let b = bases[(y / 10) * 2 + x / 10];
        let jitter = ((x * 7 + y * 13) % 5) as u16 * 40;
        Color::new(b.red + jitter, b.green + 2 * jitter, b.blue + 3 * jitter)
    });
    (grid, bases)
}

#[test]
fn converged_state_is_a_fixed_point() {
    let (grid, bases) = four_blobs();
    let cfg = config(4, 4);
    let result = KMeans::new(cfg.clone()).run_with_centroids(grid, bases).expect("valid config");
    assert!(result.is_converged());
    assert!(result.outcome.iterations() <= 2);

    let mut grid = result.grid.clone();
    let mut table = result.table.clone();
    let reassigned = assign_samples(&mut grid, &mut table, cfg.num_threads, cfg.strategy);
    let summary = update_centroids(&mut table, cfg.threshold, cfg.num_threads);

    assert_eq!(reassigned, 0);
    assert_eq!(summary.converged, 4);
    assert_eq!(table.centroids(), result.centroids());
    assert_eq!(grid.assignments(), result.grid.assignments());
}

#[test]
fn results_do_not_depend_on_scheduling() {
    let base = Config { seed: Some(42), max_iterations: Some(200), ..config(8, 1) };
    let reference = KMeans::new(base.clone()).run(gradient(48, 32)).expect("valid config");

    for threads in [2, 3, 8] {
        for strategy in [AccumulationStrategy::PartialSums, AccumulationStrategy::ClusterLocks] {
            let cfg = Config { num_threads: threads, strategy, ..base.clone() };
            let again = KMeans::new(cfg).run(gradient(48, 32)).expect("valid config");
            assert_eq!(again.centroids(), reference.centroids(), "{threads} threads, {strategy:?}");
            assert_eq!(again.grid.assignments(), reference.grid.assignments());
            assert_eq!(again.outcome, reference.outcome);
        }
    }
}

#[test]
fn iteration_cap_returns_usable_partial_result() {
    let grid = PixelGrid::from_fn(3, 2, |x, y| Color::gray([[0, 10, 20], [100, 110, 120]][y][x]));
    let cfg = Config { max_iterations: Some(1), ..config(2, 1) };
    let result = KMeans::new(cfg).run_with_centroids(grid, vec![Color::gray(0), Color::gray(10)]).expect("valid config");

    assert_eq!(result.outcome, Outcome::IterationCap { iterations: 1, converged: 1 });
    assert!(!result.is_converged());
    assert_eq!(result.centroids(), &[Color::gray(0), Color::gray(72)]);
    assert!(result.grid.assignments().iter().all(Option::is_some));
}

#[test]
fn invalid_configuration_is_reported_before_running() {
    let run = |cfg: Config| KMeans::new(cfg).run(black_and_white()).map(|_| ());
    assert_eq!(run(config(0, 1)), Err(ConfigError::NoClusters));
    assert_eq!(run(config(5, 1)), Err(ConfigError::TooManyClusters { k: 5, pixels: 4 }));
    assert_eq!(run(Config { threshold: 0.0, ..config(2, 1) }), Err(ConfigError::InvalidThreshold(0.0)));

    let mismatch = KMeans::new(config(2, 1)).run_with_centroids(black_and_white(), vec![BLACK]);
    assert_eq!(mismatch.map(|_| ()), Err(ConfigError::CentroidCountMismatch { expected: 2, actual: 1 }));
}

#[test]
fn seed_is_reported_and_reproducible() {
    let first = KMeans::new(config(3, 2)).run(noise(16, 16, 1)).expect("valid config");
    let seed = first.seed.expect("random start records its seed");
    let again = KMeans::new(Config { seed: Some(seed), ..config(3, 2) }).run(noise(16, 16, 1)).expect("valid config");
    assert_eq!(again.seed, Some(seed));
    assert_eq!(again.centroids(), first.centroids());
    assert_eq!(again.grid.assignments(), first.grid.assignments());
}
