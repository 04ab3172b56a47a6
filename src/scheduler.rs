//! Fixed-interval update/render loop.
//!
//! The browser drives `tick` from `setInterval`; a tick always runs update
//! before render. Ticks are never replayed: if the page is throttled the
//! next tick simply draws the latest state.

use std::cell::RefCell;
use std::rc::Rc;

use crate::grid::Grid;
use crate::render::{DrawSurface, Shot};
use crate::state::{GameContext, PlayerState};

/// Owns the local view of the player's snapshot.
pub trait StateManager {
    fn apply(&mut self, state: &PlayerState);

    fn draw(&self, _surface: &mut dyn DrawSurface) {}
}

/// Keeps the last applied snapshot.
#[derive(Debug, Default)]
pub struct PlayerModel {
    current: Option<PlayerState>,
    applied: u64,
}

impl PlayerModel {
    pub fn current(&self) -> Option<&PlayerState> {
        self.current.as_ref()
    }

    pub fn applied(&self) -> u64 {
        self.applied
    }
}

impl StateManager for PlayerModel {
    fn apply(&mut self, state: &PlayerState) {
        if self.current.as_ref() != Some(state) {
            self.current = Some(state.clone());
        }
        self.applied += 1;
    }
}

pub struct Scheduler<M: StateManager> {
    context: GameContext,
    grid: Rc<RefCell<Grid>>,
    model: M,
    ticks: u64,
}

impl<M: StateManager> Scheduler<M> {
    pub fn new(context: GameContext, grid: Rc<RefCell<Grid>>, model: M) -> Self {
        Scheduler { context, grid, model, ticks: 0 }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn tick(&mut self, surface: &mut dyn DrawSurface) {
        self.update();
        self.render(surface);
        self.ticks += 1;
    }

    fn update(&mut self) {
        let state = self.context.borrow();
        if let Some(player) = state.player_state() {
            self.model.apply(player);
        }
    }

    fn render(&self, surface: &mut dyn DrawSurface) {
        let state = self.context.borrow();
        surface.begin_frame();
        self.model.draw(surface);
        self.grid.borrow().draw(surface);

        for tower in state.towers() {
            surface.draw_tower(tower);
        }

        // Absent list means "not received yet": skip, don't draw empty.
        if let Some(creeps) = state.creeps() {
            for creep in creeps {
                surface.draw_creep(creep);
            }
        }

        if let Some(attacks) = state.attacks() {
            for (attacker, targets) in attacks.iter() {
                for &target in targets {
                    surface.draw_shot(&Shot {
                        attacker,
                        target,
                        from: state.tower_cell(attacker),
                        to: state.creep_position(target),
                    });
                }
            }
        }

        surface.end_frame();
    }
}
