use ferrite_arena_nn::{ActivationFunction, Arena, Matrix, Network};
use rand::rngs::StdRng;
use rand::SeedableRng;

const EPS: f64 = 1e-3;
const TOLERANCE: f64 = 1e-2;

fn assert_gradients_match(analytic: &Network<'_>, numeric: &Network<'_>) {
    for i in 0..analytic.layer_count() {
        let pairs = analytic
            .weights(i)
            .as_slice()
            .iter()
            .zip(numeric.weights(i).as_slice())
            .chain(analytic.biases(i).as_slice().iter().zip(numeric.biases(i).as_slice()));
        for (a, n) in pairs {
            assert!((a - n).abs() < TOLERANCE, "layer {i}: backprop {a} vs finite difference {n}");
        }
    }
}

#[test]
fn scalar_weight_matches_symmetric_difference() {
    let mut net = Network::new(None, &[1, 1], ActivationFunction::Sigmoid).unwrap();
    net.weights_mut(0).as_mut_slice()[0] = 0.7;
    net.biases_mut(0).as_mut_slice()[0] = -0.2;
    let table = Matrix::from_rows(None, &[[0.9, 0.3]]).unwrap();

    let gradient = net.backprop(None, table.view()).unwrap();

    net.weights_mut(0).as_mut_slice()[0] = 0.7 + EPS;
    let plus = net.cost(table.view());
    net.weights_mut(0).as_mut_slice()[0] = 0.7 - EPS;
    let minus = net.cost(table.view());
    let numeric = (plus - minus) / (2.0 * EPS);

    let analytic = gradient.weights(0).at(0, 0);
    assert!(
        (analytic - numeric).abs() < TOLERANCE,
        "backprop {analytic} vs finite difference {numeric}"
    );
}

#[test]
fn multilayer_gradients_match_for_smooth_activations() {
    let table = Matrix::from_rows(
        None,
        &[[0.1, 0.9, 1.0, 0.0], [0.7, 0.2, 0.0, 1.0], [0.5, 0.5, 0.3, 0.6]],
    )
    .unwrap();

    for (activation, range) in [
        (ActivationFunction::Sigmoid, 1.0),
        (ActivationFunction::Tanh, 1.0),
        (ActivationFunction::Sin, 0.3),
    ] {
        let mut net = Network::new(None, &[2, 3, 2], activation).unwrap();
        net.randomize(&mut StdRng::seed_from_u64(21), -range, range);

        let analytic = net.backprop(None, table.view()).unwrap();
        let numeric = net.finite_diff(None, EPS, table.view()).unwrap();
        assert_gradients_match(&analytic, &numeric);
    }
}

#[test]
fn arena_gradients_equal_heap_gradients() {
    let table = Matrix::from_rows(None, &[[0.0, 1.0, 1.0], [1.0, 1.0, 0.0]]).unwrap();
    let mut net = Network::new(None, &[2, 2, 1], ActivationFunction::Sigmoid).unwrap();
    net.randomize(&mut StdRng::seed_from_u64(8), -1.0, 1.0);

    let mut arena = Arena::new(1024);
    let heap = net.backprop(None, table.view()).unwrap();
    arena.scoped(|scratch| {
        let from_arena = net.backprop(Some(scratch), table.view()).unwrap();
        for i in 0..heap.layer_count() {
            assert_eq!(heap.weights(i).as_slice(), from_arena.weights(i).as_slice());
            assert_eq!(heap.biases(i).as_slice(), from_arena.biases(i).as_slice());
        }
    });
    assert_eq!(arena.occupied_bytes(), 0);
}

#[test]
fn learning_along_the_gradient_lowers_the_cost() {
    let table = Matrix::from_rows(None, &[[0.0, 1.0, 1.0], [1.0, 0.0, 1.0]]).unwrap();
    let mut net = Network::new(None, &[2, 2, 1], ActivationFunction::Tanh).unwrap();
    net.randomize(&mut StdRng::seed_from_u64(30), -0.5, 0.5);

    let before = net.cost(table.view());
    let gradient = net.backprop(None, table.view()).unwrap();
    net.learn(&gradient, 0.05);
    assert!(net.cost(table.view()) < before);
}
