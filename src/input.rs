use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::config::{ButtonSpec, ClientConfig};
use crate::grid::Grid;
use crate::protocol::{Cell, OutboundRequest, PlayerId, TowerIntent};
use crate::selection::{CreepLauncher, TowerSelection};
use crate::transport::RequestSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Activation {
    Tower(usize),
    Creep(usize),
}

/// Turns pointer, keyboard and button events into requests.
pub struct InputRouter {
    player: PlayerId,
    grid: Rc<RefCell<Grid>>,
    sink: Rc<dyn RequestSink>,
    selection: TowerSelection,
    launcher: CreepLauncher,
    tower_intents: Vec<TowerIntent>,
    creep_count: usize,
    hotkeys: Vec<(u32, Activation)>,
    disarm_key: Option<u32>,
}

impl InputRouter {
    pub fn new(config: &ClientConfig, grid: Rc<RefCell<Grid>>, sink: Rc<dyn RequestSink>) -> Self {
        let tower_specs: Vec<&ButtonSpec> = config
            .tower_buttons
            .iter()
            .chain(config.demolish_button.as_ref())
            .collect();

        let mut tower_intents: Vec<TowerIntent> =
            (0..config.tower_buttons.len()).map(TowerIntent::Build).collect();
        if config.demolish_button.is_some() {
            tower_intents.push(TowerIntent::Demolish);
        }

        // Towers before creeps, matching the order the listeners fire in.
        let hotkeys = tower_specs
            .iter()
            .enumerate()
            .map(|(i, spec)| (spec.hotkey.key_code, Activation::Tower(i)))
            .chain(
                config
                    .creep_buttons
                    .iter()
                    .enumerate()
                    .map(|(i, spec)| (spec.hotkey.key_code, Activation::Creep(i))),
            )
            .collect();

        InputRouter {
            player: config.player_id,
            grid,
            sink,
            selection: TowerSelection::default(),
            launcher: CreepLauncher::new(config.creep_encoding),
            tower_intents,
            creep_count: config.creep_buttons.len(),
            hotkeys,
            disarm_key: config.disarm_key,
        }
    }

    pub fn armed(&self) -> Option<TowerIntent> {
        self.selection.armed()
    }

    pub fn disarm(&mut self) {
        self.selection.clear();
    }

    /// Tower button `index` (the demolish button, if configured, comes
    /// after the build buttons).
    pub fn press_tower_button(&mut self, index: usize) {
        if let Some(&intent) = self.tower_intents.get(index) {
            self.selection.press(intent);
            debug!(button = index, armed = ?self.selection.armed(), "tower button");
        }
    }

    pub fn press_creep_button(&mut self, index: usize) {
        if index < self.creep_count {
            self.sink.send(self.launcher.fire(self.player, index));
        }
    }

    /// A hotkey is a synthetic click on every button bound to the key.
    pub fn key_down(&mut self, key_code: u32) {
        if self.disarm_key == Some(key_code) {
            self.disarm();
        }

        let matched: Vec<Activation> = self
            .hotkeys
            .iter()
            .filter(|(code, _)| *code == key_code)
            .map(|(_, activation)| *activation)
            .collect();

        for activation in matched {
            match activation {
                Activation::Tower(index) => self.press_tower_button(index),
                Activation::Creep(index) => self.press_creep_button(index),
            }
        }
    }

    pub fn pointer_move(&mut self, page_x: f32, page_y: f32) {
        self.grid.borrow_mut().pointer_moved(page_x, page_y);
    }

    /// Sends a tower request for the clicked cell when an intent is armed.
    /// The intent stays armed afterwards.
    pub fn pointer_click(&mut self, page_x: f32, page_y: f32) -> Option<Cell> {
        let intent = self.selection.armed()?;
        let cell = self.grid.borrow().pixel_to_cell(page_x, page_y)?;
        self.sink.send(OutboundRequest::tower(self.player, cell, intent));
        Some(cell)
    }

    pub fn send_chat(&self, text: &str) {
        self.sink.send(OutboundRequest::chat(self.player, text));
    }
}
