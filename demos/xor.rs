use anyhow::Result;
use ferrite_arena_nn::{train_loop, Arena, Matrix, TrainConfig};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = TrainConfig::new(vec![2, 2, 1], 20_000, 1.0);
    config.batch_size = Some(2);
    config.shuffle = true;
    config.seed = Some(42);

    let mut rng = config.rng();
    let mut network = config.build_network(&mut rng)?;
    let mut table = Matrix::from_rows(
        None,
        &[[0.0, 0.0, 0.0], [0.0, 1.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 0.0]],
    )?;
    let mut arena = Arena::new(config.arena_capacity);

    let history = train_loop(&mut network, &mut arena, &mut table, &config, &mut rng)?;
    if let Some(last) = history.last() {
        println!("Final epoch {}: cost = {:.6}", last.epoch, last.cost);
    }

    for input in [[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]] {
        println!("Input: {:?} -> Output: {:.4}", input, network.predict(&input)[0]);
    }

    Ok(())
}
