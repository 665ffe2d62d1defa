use kmeans::{
    BackendKind, BackendOptions, Centroid, ExecutionBackend, Observation, RefineContext, Status,
    fit, fit_preassigned, min_accepted_error, nearest::nearest, reset_labels, synthetic,
};

const CENTERS: [(f64, f64); 5] =
    [(0.0, 0.0), (40.0, 0.0), (0.0, 40.0), (40.0, 40.0), (20.0, 80.0)];

fn options(workers: usize, device_accumulate: bool) -> BackendOptions {
    BackendOptions { workers, block_size: 128, device_accumulate }
}

fn every_backend() -> Vec<(String, Box<dyn ExecutionBackend>)> {
    let mut backends = vec![(
        "sequential".to_string(),
        BackendKind::Sequential.build(&options(1, false)).unwrap(),
    )];
    for workers in [1, 2, 4, 8] {
        for kind in [BackendKind::Threaded, BackendKind::Offload] {
            backends.push((format!("{kind}/{workers}"), kind.build(&options(workers, false)).unwrap()));
        }
        for device_accumulate in [false, true] {
            backends.push((
                format!("discrete/{workers}/{device_accumulate}"),
                BackendKind::Discrete.build(&options(workers, device_accumulate)).unwrap(),
            ));
        }
    }
    backends
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

#[test]
fn accumulation_counts_every_point_once() {
    let mut points = synthetic::gaussian_blobs(&CENTERS, 1_013, 3.0, 11).unwrap();
    for (i, point) in points.iter_mut().enumerate() {
        point.group = (i * 31) % 7;
    }
    for (name, backend) in every_backend() {
        let sums = backend.accumulate(&points, 7).unwrap();
        assert_eq!(sums.total(), points.len(), "{name}");
    }
}

#[test]
fn backends_agree_on_the_result() {
    let base = synthetic::gaussian_blobs(&CENTERS, 2_000, 2.0, 3).unwrap();
    let ctx = RefineContext::seeded(42);

    let mut expected_points = base.clone();
    let reference = BackendKind::Sequential.build(&options(1, false)).unwrap();
    let expected = fit(&mut expected_points, 5, &reference, &ctx).unwrap();
    assert_eq!(expected.status, Status::Converged);

    for (name, backend) in every_backend() {
        let mut points = base.clone();
        let result = fit(&mut points, 5, &backend, &ctx).unwrap();
        assert_eq!(result.iterations, expected.iterations, "{name}");
        for (got, want) in result.centroids.iter().zip(&expected.centroids) {
            assert_eq!(got.count, want.count, "{name}");
            assert!(close(got.x, want.x) && close(got.y, want.y), "{name}: {got:?} vs {want:?}");
        }
        assert!(points.iter().zip(&expected_points).all(|(a, b)| a.group == b.group), "{name}");
    }
}

#[test]
fn two_columns_converge_for_any_seed() {
    let coords = [(0.0, 0.0), (0.0, 1.0), (10.0, 0.0), (10.0, 1.0)];
    let backend = BackendKind::Threaded.build(&options(2, false)).unwrap();
    for seed in 0..64 {
        let mut points: Vec<Observation> =
            coords.iter().map(|&(x, y)| Observation::new(x, y)).collect();
        let result = fit(&mut points, 2, &backend, &RefineContext::seeded(seed)).unwrap();
        assert_eq!(result.status, Status::Converged);
        assert_eq!(result.history.last().unwrap().changed, 0);
        assert_eq!(result.centroids.iter().map(|c| c.count).sum::<usize>(), 4);
        for point in &points {
            assert_eq!(point.group, nearest(point.x, point.y, &result.centroids));
        }
    }

    let mut points: Vec<Observation> =
        coords.iter().map(|&(x, y)| Observation::new(x, y)).collect();
    for (point, group) in points.iter_mut().zip([1, 1, 0, 0]) {
        point.group = group;
    }
    let result = fit_preassigned(&mut points, 2, &backend, &RefineContext::seeded(0)).unwrap();
    assert_eq!(
        result.centroids,
        vec![Centroid { x: 10.0, y: 0.5, count: 2 }, Centroid { x: 0.0, y: 0.5, count: 2 }]
    );
}

#[test]
fn single_group_and_singletons_on_parallel_backends() {
    let backend = BackendKind::Offload.build(&options(4, false)).unwrap();
    let mut points = vec![
        Observation::new(1.0, 1.0),
        Observation::new(3.0, 1.0),
        Observation::new(2.0, 4.0),
        Observation::new(2.0, 2.0),
    ];

    let result = fit(&mut points, 1, &backend, &RefineContext::default()).unwrap();
    assert_eq!(result.centroids, vec![Centroid { x: 2.0, y: 2.0, count: 4 }]);
    assert!(points.iter().all(|p| p.group == 0));

    reset_labels(&mut points);
    let result = fit(&mut points, 10, &backend, &RefineContext::default()).unwrap();
    assert_eq!(result.status, Status::Degenerate);
    assert_eq!(result.centroids.iter().filter(|c| c.count == 1).count(), 4);
    assert_eq!(result.centroids.iter().filter(|c| c.count == 0).count(), 6);
}

#[test]
fn replicated_blobs_terminate() {
    let sample = synthetic::gaussian_blobs(&CENTERS, 520, 2.5, 2024).unwrap();
    let mut points = synthetic::replicate(&sample, 1_000).unwrap();
    assert_eq!(points.len(), 2_600_000);
    assert_eq!(min_accepted_error(points.len()), 260);

    let backend = BackendKind::Threaded.build(&options(4, false)).unwrap();
    let ctx = RefineContext::seeded(5).with_max_iterations(500);
    let result = fit(&mut points, 5, &backend, &ctx).unwrap();
    assert_eq!(result.status, Status::Converged);
    assert!(result.history.last().unwrap().changed <= 260);
    assert_eq!(result.centroids.iter().map(|c| c.count).sum::<usize>(), points.len());
}
