//! Contract for the random draws a firm consumes.

/// Independent draws consumed by firm construction and innovation.
///
/// Each stream is independent; constructing a firm consumes exactly one draw
/// from each of the five attribute streams, and each period commit consumes
/// exactly one innovation shock.
pub trait RandomSource {
    fn next_first_unit_cost(&mut self) -> f64;
    fn next_rd_efficiency(&mut self) -> f64;
    fn next_target_leverage(&mut self) -> f64;
    fn next_learning_rate(&mut self) -> f64;
    fn next_initial_equity(&mut self) -> f64;
    /// Multiplicative shock with mean one.
    fn next_innovation_shock(&mut self) -> f64;

    /// Draw one value from every attribute stream.
    fn initial_draws(&mut self) -> InitialDraws {
        InitialDraws {
            first_unit_cost: self.next_first_unit_cost(),
            rd_efficiency: self.next_rd_efficiency(),
            target_leverage: self.next_target_leverage(),
            learning_rate: self.next_learning_rate(),
            initial_equity: self.next_initial_equity(),
        }
    }
}

/// Attribute draws for a new entrant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InitialDraws {
    pub first_unit_cost: f64,
    pub rd_efficiency: f64,
    pub target_leverage: f64,
    pub learning_rate: f64,
    pub initial_equity: f64,
}

/// Replays fixed values; every innovation shock is the same constant.
///
/// Useful for deterministic scenarios where no randomness is wanted.
#[derive(Clone, Debug)]
pub struct FixedSource {
    pub draws: InitialDraws,
    pub innovation_shock: f64,
}

impl FixedSource {
    /// Fixed draws with neutral innovation.
    pub fn new(draws: InitialDraws) -> Self {
        Self {
            draws,
            innovation_shock: 1.0,
        }
    }
}

impl RandomSource for FixedSource {
    fn next_first_unit_cost(&mut self) -> f64 {
        self.draws.first_unit_cost
    }
    fn next_rd_efficiency(&mut self) -> f64 {
        self.draws.rd_efficiency
    }
    fn next_target_leverage(&mut self) -> f64 {
        self.draws.target_leverage
    }
    fn next_learning_rate(&mut self) -> f64 {
        self.draws.learning_rate
    }
    fn next_initial_equity(&mut self) -> f64 {
        self.draws.initial_equity
    }
    fn next_innovation_shock(&mut self) -> f64 {
        self.innovation_shock
    }
}
