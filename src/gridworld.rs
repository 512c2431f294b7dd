use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use strum::{FromRepr, VariantArray};

use crate::{
    env::{DiscreteActionSpace, Environment, Report},
    error::{Error, Result},
};

/// Grid coordinates as `(x, y)`, with `y` growing downward
pub type Pos = (i32, i32);

/// The externally visible state of a [`GridWorld`]: agent position plus has-key flag
///
/// The key flag is always part of the state key. On levels without a key it stays
/// `false`, so those levels simply never branch on it.
pub type GridState = (Pos, bool);

/// The discrete action set: one fixed offset per cardinal direction
#[derive(
    FromRepr,
    VariantArray,
    Clone,
    Copy,
    Debug,
    Hash,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
)]
pub enum Action {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
}

impl Action {
    /// Size of the action set
    pub const COUNT: usize = 4;

    /// The `(dx, dy)` offset this action applies
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Action::Up => (0, -1),
            Action::Down => (0, 1),
            Action::Left => (-1, 0),
            Action::Right => (1, 0),
        }
    }

    /// Convert a raw action index from an external caller into an [`Action`]
    ///
    /// Indices outside the action set are rejected with [`Error::InvalidAction`] rather
    /// than clamped, so a bad caller cannot smuggle a nonexistent action dimension into
    /// a value table.
    pub fn from_index(index: usize) -> Result<Self> {
        Self::from_repr(index).ok_or(Error::InvalidAction(index))
    }
}

/// Tile kinds making up a grid
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tile {
    Floor,
    Rock,
    Apple,
    Fire,
    Key,
    Chest,
    Monster,
}

/// A stochastic grid world MDP with collectibles and wandering monsters
///
/// The grid template passed at construction is immutable; every [`reset`](Environment::reset)
/// copies it into a working grid that [`step`](Environment::step) mutates. Monsters are
/// processed once per step in row-major order of their template position, each moving
/// independently with probability 0.4. All randomness comes from an owned [`StdRng`]
/// seeded at construction, so rollouts are reproducible.
pub struct GridWorld {
    template: Vec<Vec<Tile>>,
    grid: Vec<Vec<Tile>>,
    start: Pos,
    agent: Pos,
    has_key: bool,
    done: bool,
    monsters: Vec<Pos>,
    death_penalty: f32,
    rng: StdRng,
    pub report: Report,
}

impl GridWorld {
    /// Create a grid world from a template, seeded from entropy
    ///
    /// The agent always starts at `(0, 0)`.
    pub fn new(template: Vec<Vec<Tile>>) -> Self {
        Self::with_rng(template, StdRng::from_entropy())
    }

    /// Create a grid world with a fixed seed for reproducible rollouts
    pub fn seeded(template: Vec<Vec<Tile>>, seed: u64) -> Self {
        Self::with_rng(template, StdRng::seed_from_u64(seed))
    }

    fn with_rng(template: Vec<Vec<Tile>>, rng: StdRng) -> Self {
        assert!(
            !template.is_empty() && !template[0].is_empty(),
            "grid template must be non-empty"
        );
        let mut env = Self {
            template,
            grid: Vec::new(),
            start: (0, 0),
            agent: (0, 0),
            has_key: false,
            done: false,
            monsters: Vec::new(),
            death_penalty: -1.0,
            rng,
            report: Report::new(vec!["reward", "steps"]),
        };
        env.restore_template();
        env
    }

    /// Parse a grid world from an ASCII map
    ///
    /// Legend: `.` floor, `#` rock, `A` apple, `F` fire, `K` key, `C` chest, `M` monster.
    /// Lines are trimmed; blank lines are skipped.
    ///
    /// **Panics** on characters outside the legend.
    pub fn from_ascii(map: &str) -> Self {
        let template = map
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                line.chars()
                    .map(|c| match c {
                        '.' => Tile::Floor,
                        '#' => Tile::Rock,
                        'A' => Tile::Apple,
                        'F' => Tile::Fire,
                        'K' => Tile::Key,
                        'C' => Tile::Chest,
                        'M' => Tile::Monster,
                        _ => panic!("unknown map character {c:?}"),
                    })
                    .collect()
            })
            .collect();
        Self::new(template)
    }

    /// Override the reward applied when the agent dies to fire or a monster
    pub fn with_death_penalty(mut self, penalty: f32) -> Self {
        self.death_penalty = penalty;
        self
    }

    /// Replace the random source with one seeded from `seed`
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// The current state key
    pub fn state(&self) -> GridState {
        (self.agent, self.has_key)
    }

    /// Read-only snapshot of the working grid, for rendering consumers
    pub fn grid(&self) -> &[Vec<Tile>] {
        &self.grid
    }

    /// The agent's current cell
    pub fn agent_pos(&self) -> Pos {
        self.agent
    }

    /// Current monster positions, in their fixed processing order
    pub fn monster_positions(&self) -> &[Pos] {
        &self.monsters
    }

    /// Whether the agent currently holds the key
    pub fn has_key(&self) -> bool {
        self.has_key
    }

    fn in_bounds(&self, (x, y): Pos) -> bool {
        y >= 0 && (y as usize) < self.grid.len() && x >= 0 && (x as usize) < self.grid[0].len()
    }

    fn tile(&self, (x, y): Pos) -> Tile {
        self.grid[y as usize][x as usize]
    }

    fn set_tile(&mut self, (x, y): Pos, tile: Tile) {
        self.grid[y as usize][x as usize] = tile;
    }

    /// Copy the template back into the working grid and rebuild all episode state
    fn restore_template(&mut self) {
        self.grid = self.template.clone();
        self.agent = self.start;
        self.has_key = false;
        self.done = false;
        // Row-major scan fixes the monster processing order for the whole episode
        self.monsters.clear();
        for (y, row) in self.grid.iter().enumerate() {
            for (x, &tile) in row.iter().enumerate() {
                if tile == Tile::Monster {
                    self.monsters.push((x as i32, y as i32));
                }
            }
        }
    }

    /// Advance every live monster once, in stored order
    ///
    /// Each monster independently attempts a move with probability 0.4, scanning the
    /// four directions in a uniformly shuffled order and taking the first destination
    /// that is the agent's cell (a collision) or empty floor. Monsters move on the
    /// working grid, so later monsters in the order see earlier moves and never contest
    /// an occupied destination.
    ///
    /// **Returns** whether any monster landed on the agent's cell
    fn advance_monsters(&mut self) -> bool {
        let mut collided = false;
        for i in 0..self.monsters.len() {
            if self.rng.gen::<f64>() >= 0.4 {
                continue;
            }
            let mut directions = Action::VARIANTS.to_vec();
            directions.shuffle(&mut self.rng);
            let (x, y) = self.monsters[i];
            for dir in directions {
                let (dx, dy) = dir.offset();
                let dest = (x + dx, y + dy);
                if !self.in_bounds(dest) {
                    continue;
                }
                let hits_agent = dest == self.agent && self.tile(dest) != Tile::Monster;
                if hits_agent || self.tile(dest) == Tile::Floor {
                    self.set_tile((x, y), Tile::Floor);
                    self.set_tile(dest, Tile::Monster);
                    self.monsters[i] = dest;
                    collided |= hits_agent;
                    break;
                }
            }
        }
        collided
    }

    /// Whether every apple and chest has been collected
    fn all_collected(&self) -> bool {
        !self
            .grid
            .iter()
            .flatten()
            .any(|&tile| tile == Tile::Apple || tile == Tile::Chest)
    }
}

impl Environment for GridWorld {
    type State = GridState;
    type Action = Action;

    fn is_active(&self) -> bool {
        !self.done
    }

    fn step(&mut self, action: Action) -> (GridState, f32) {
        if self.done {
            return (self.state(), 0.0);
        }

        self.report.entry("steps").and_modify(|x| *x += 1.0);

        let (dx, dy) = action.offset();
        let candidate = (self.agent.0 + dx, self.agent.1 + dy);
        let mut reward = 0.0;

        // Off-grid moves and rocks leave the agent in place
        if self.in_bounds(candidate) && self.tile(candidate) != Tile::Rock {
            self.agent = candidate;
            match self.tile(candidate) {
                Tile::Apple => {
                    reward = 1.0;
                    self.set_tile(candidate, Tile::Floor);
                }
                Tile::Fire | Tile::Monster => {
                    self.done = true;
                    reward = self.death_penalty;
                }
                Tile::Key => {
                    self.has_key = true;
                    self.set_tile(candidate, Tile::Floor);
                }
                Tile::Chest if self.has_key => {
                    reward = 2.0;
                    self.set_tile(candidate, Tile::Floor);
                }
                _ => {}
            }
        }

        if !self.done && self.advance_monsters() {
            // A monster caught the agent: the death penalty replaces any reward
            // collected earlier in this step
            self.done = true;
            reward = self.death_penalty;
        }

        if self.all_collected() {
            self.done = true;
        }

        self.report.entry("reward").and_modify(|x| *x += reward as f64);
        (self.state(), reward)
    }

    fn reset(&mut self) -> GridState {
        self.restore_template();
        self.state()
    }
}

impl DiscreteActionSpace for GridWorld {
    fn actions(&self) -> Vec<Action> {
        Action::VARIANTS.to_vec()
    }
}

/// Named demo levels
pub mod levels {
    /// An open orchard: apples among rocks, with a fire pit to avoid
    pub const ORCHARD: &str = "\
        ..A..#
        .#.#A.
        ..F...
        A...#A";

    /// A locked vault: fetch the key, dodge the monsters, open the chest
    pub const VAULT: &str = "\
        ....#K
        .##.#.
        .M#...
        ..#.##
        A...MC";
}

#[cfg(test)]
mod tests {
    use super::*;

    impl GridWorld {
        fn tile_at(&self, pos: Pos) -> Tile {
            self.tile(pos)
        }
    }

    #[test]
    fn movement_and_blocking() {
        let mut env = GridWorld::from_ascii(
            ".#A
             ...
             ..A",
        );
        env.step(Action::Right);
        assert_eq!(env.agent_pos(), (0, 0), "rock blocks movement");
        env.step(Action::Up);
        assert_eq!(env.agent_pos(), (0, 0), "grid edge blocks movement");
        env.step(Action::Down);
        assert_eq!(env.agent_pos(), (0, 1));
        env.step(Action::Right);
        assert_eq!(env.agent_pos(), (1, 1));
        assert_eq!(env.report["steps"], 4.0);
    }

    #[test]
    fn apple_reward_and_consumption() {
        let mut env = GridWorld::from_ascii("AA.");
        let (state, reward) = env.step(Action::Right);
        assert_eq!(reward, 1.0);
        assert_eq!(state, ((1, 0), false));
        assert_eq!(env.tile_at((1, 0)), Tile::Floor, "apple is consumed");
        assert!(env.is_active(), "one apple remains");

        let (_, reward) = env.step(Action::Left);
        assert_eq!(reward, 1.0);
        assert!(!env.is_active(), "all collectibles gone ends the episode");
    }

    #[test]
    fn fire_is_fatal() {
        let mut env = GridWorld::from_ascii(".FA").with_death_penalty(-5.0);
        let (_, reward) = env.step(Action::Right);
        assert_eq!(reward, -5.0);
        assert!(!env.is_active());
    }

    #[test]
    fn stepping_onto_monster_is_fatal() {
        let mut env = GridWorld::from_ascii(".MA");
        let (_, reward) = env.step(Action::Right);
        assert_eq!(reward, -1.0);
        assert!(!env.is_active());
    }

    #[test]
    fn chest_requires_key() {
        let mut env = GridWorld::from_ascii(".CK");
        let (state, reward) = env.step(Action::Right);
        assert_eq!(reward, 0.0, "chest without key has no effect");
        assert_eq!(env.tile_at((1, 0)), Tile::Chest, "chest remains");
        assert_eq!(state, ((1, 0), false));

        let (state, _) = env.step(Action::Right);
        assert_eq!(state, ((2, 0), true), "key sets the flag and enters the state");
        assert_eq!(env.tile_at((2, 0)), Tile::Floor, "key is consumed");

        let (_, reward) = env.step(Action::Left);
        assert_eq!(reward, 2.0);
        assert_eq!(env.tile_at((1, 0)), Tile::Floor, "chest is consumed");
        assert!(!env.is_active(), "last collectible ends the episode");
    }

    #[test]
    fn terminal_step_is_idempotent() {
        let mut env = GridWorld::from_ascii(".FA");
        env.step(Action::Right);
        assert!(!env.is_active());

        let frozen_grid = env.grid().to_vec();
        let frozen_state = env.state();
        for action in [Action::Up, Action::Down, Action::Left, Action::Right] {
            let (state, reward) = env.step(action);
            assert_eq!(state, frozen_state);
            assert_eq!(reward, 0.0);
            assert!(!env.is_active());
        }
        assert_eq!(env.grid(), frozen_grid.as_slice(), "grid is never mutated once terminal");
        assert_eq!(env.agent_pos(), frozen_state.0);
    }

    #[test]
    fn empty_grid_terminates_immediately() {
        for action in [Action::Up, Action::Down, Action::Left, Action::Right] {
            let mut env = GridWorld::from_ascii(
                "...
                 .#.",
            );
            env.step(action);
            assert!(!env.is_active(), "no collectibles means terminal on first step");
        }
    }

    #[test]
    fn reset_restores_template() {
        let mut env = GridWorld::from_ascii("AK.");
        env.step(Action::Right);
        env.step(Action::Right);
        let state = env.reset();
        assert_eq!(state, ((0, 0), false));
        assert_eq!(env.tile_at((0, 0)), Tile::Apple, "consumed tiles are restored");
        assert_eq!(env.tile_at((1, 0)), Tile::Key);
        assert!(env.is_active());
    }

    #[test]
    fn invalid_action_index_is_rejected() {
        assert!(Action::from_index(3).is_ok());
        assert!(matches!(
            Action::from_index(4),
            Err(crate::Error::InvalidAction(4))
        ));
    }

    #[test]
    fn action_space_is_fixed() {
        let env = GridWorld::from_ascii("A.");
        assert_eq!(env.actions().len(), Action::COUNT);
    }

    #[test]
    fn monster_collision_frequency_single_exit() {
        // Agent at (0,0), monster at (1,0), rock at (2,0): the agent's cell is the
        // monster's only qualifying destination, so a collision happens exactly when
        // the monster decides to move: p = 0.4.
        let trials = 10_000;
        let mut collisions = 0;
        for seed in 0..trials {
            let mut env = GridWorld::from_ascii(".M#").with_seed(seed);
            let (_, reward) = env.step(Action::Up); // blocked, agent stays put
            if reward == -1.0 {
                assert!(!env.is_active());
                collisions += 1;
            }
        }
        let freq = collisions as f64 / trials as f64;
        assert!((freq - 0.4).abs() < 0.02, "collision frequency ~0.4, got {freq}");
    }

    #[test]
    fn monster_collision_frequency_with_tie_break() {
        // Two qualifying destinations (agent's cell and a floor cell): the agent's cell
        // comes first in the shuffled scan half the time, so p = 0.4 * 0.5.
        let trials = 10_000;
        let mut collisions = 0;
        for seed in 0..trials {
            let mut env = GridWorld::from_ascii(".M.#").with_seed(seed);
            let (_, reward) = env.step(Action::Up);
            if reward == -1.0 {
                collisions += 1;
            }
        }
        let freq = collisions as f64 / trials as f64;
        assert!((freq - 0.2).abs() < 0.02, "collision frequency ~0.2, got {freq}");
    }

    #[test]
    fn monsters_never_stack() {
        // Two monsters in a corridor sharing one reachable floor cell: whichever moves
        // first claims it, the other sees the occupancy and stays distinct.
        for seed in 0..500 {
            let mut env = GridWorld::from_ascii(
                "A####
                 #####
                 .M.M.",
            )
            .with_seed(seed);
            env.step(Action::Up); // off-grid, agent stays put
            let positions = env.monster_positions().to_vec();
            assert_ne!(positions[0], positions[1], "seed {seed}");
            assert!(env.is_active(), "monsters cannot reach the walled-off agent");
        }
    }

    #[test]
    fn report_accumulates_until_taken() {
        let mut env = GridWorld::from_ascii("AA.");
        env.step(Action::Right);
        env.reset();
        env.step(Action::Right);
        assert_eq!(env.report["steps"], 2.0, "reset does not drain the report");
        assert_eq!(env.report["reward"], 2.0);

        env.report.take();
        assert_eq!(env.report["steps"], 0.0);
    }

    #[test]
    fn named_levels_parse() {
        let orchard = GridWorld::from_ascii(levels::ORCHARD);
        assert_eq!(orchard.grid().len(), 4);
        assert!(orchard.monster_positions().is_empty());

        let vault = GridWorld::from_ascii(levels::VAULT);
        assert_eq!(vault.monster_positions(), &[(1, 2), (4, 4)]);
    }
}
