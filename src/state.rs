use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::Deserialize;
use serde_json::Value;

use crate::protocol::{Cell, CreepId, StateUpdate, TowerId, TowerSnapshot};

/// Player snapshot as pushed by the server. Its shape belongs to the server
/// and the state manager; this layer only stores it.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(transparent)]
pub struct PlayerState(pub Value);

impl PlayerState {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// Position is in grid cells; fractional while a creep walks between cells.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Creep {
    #[serde(alias = "creepID")]
    pub id: CreepId,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub kind: Option<u32>,
}

/// Attacker id to the creeps it shot this frame, iterated by ascending
/// attacker id so repeated renders issue identical draw calls.
#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct AttackMap(BTreeMap<TowerId, Vec<CreepId>>);

impl AttackMap {
    pub fn targets(&self, attacker: TowerId) -> Option<&[CreepId]> {
        self.0.get(&attacker).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TowerId, &[CreepId])> {
        self.0.iter().map(|(attacker, targets)| (*attacker, targets.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(TowerId, Vec<CreepId>)> for AttackMap {
    fn from_iter<I: IntoIterator<Item = (TowerId, Vec<CreepId>)>>(iter: I) -> Self {
        AttackMap(iter.into_iter().collect())
    }
}

// --- SHARED GAME STATE ---

/// Everything the server has told us. Written only by the transport's
/// inbound handler, read by the scheduler once per tick. Each holder stays
/// `None` until the first push that carries it.
#[derive(Debug, Default)]
pub struct SharedGameState {
    player_state: Option<PlayerState>,
    creeps: Option<Vec<Creep>>,
    attacks: Option<AttackMap>,
    towers: BTreeMap<TowerId, TowerSnapshot>,
    revision: u64,
}

pub type GameContext = Rc<RefCell<SharedGameState>>;

pub fn new_context() -> GameContext {
    Rc::new(RefCell::new(SharedGameState::default()))
}

impl SharedGameState {
    pub fn player_state(&self) -> Option<&PlayerState> {
        self.player_state.as_ref()
    }

    pub fn creeps(&self) -> Option<&[Creep]> {
        self.creeps.as_deref()
    }

    pub fn attacks(&self) -> Option<&AttackMap> {
        self.attacks.as_ref()
    }

    pub fn towers(&self) -> impl Iterator<Item = &TowerSnapshot> {
        self.towers.values()
    }

    /// Bumped on every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn set_player_state(&mut self, state: PlayerState) {
        self.player_state = Some(state);
        self.revision += 1;
    }

    pub fn set_creeps(&mut self, creeps: Vec<Creep>) {
        self.creeps = Some(creeps);
        self.revision += 1;
    }

    pub fn set_attacks(&mut self, attacks: AttackMap) {
        self.attacks = Some(attacks);
        self.revision += 1;
    }

    /// Applies every field the push carried, all inside one borrow.
    pub fn apply_update(&mut self, update: StateUpdate) {
        if let Some(state) = update.player_state {
            self.set_player_state(state);
        }
        if let Some(creeps) = update.creeps {
            self.set_creeps(creeps);
        }
        if let Some(attacks) = update.attacks {
            self.set_attacks(attacks);
        }
    }

    pub fn record_tower(&mut self, tower: TowerSnapshot) {
        self.towers.insert(tower.id, tower);
        self.revision += 1;
    }

    pub fn remove_tower_at(&mut self, cell: Cell) {
        let before = self.towers.len();
        self.towers.retain(|_, tower| tower.cell() != cell);
        if self.towers.len() != before {
            self.revision += 1;
        }
    }

    pub fn tower_cell(&self, id: TowerId) -> Option<Cell> {
        self.towers.get(&id).map(TowerSnapshot::cell)
    }

    pub fn creep_position(&self, id: CreepId) -> Option<(f32, f32)> {
        self.creeps
            .as_ref()?
            .iter()
            .find(|creep| creep.id == id)
            .map(|creep| (creep.x, creep.y))
    }
}
