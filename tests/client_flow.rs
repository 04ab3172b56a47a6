use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{json, Value};
use td_client::config::ClientConfig;
use td_client::error::ClientError;
use td_client::grid::Grid;
use td_client::input::InputRouter;
use td_client::protocol::{Cell, TowerSnapshot};
use td_client::render::{CellStyle, DrawSurface, PixelSurface, Shot};
use td_client::scheduler::{PlayerModel, Scheduler};
use td_client::state::{new_context, Creep};
use td_client::transport::{ConnectionState, Socket, TransportChannel};

#[derive(Clone, Default)]
struct Wire(Rc<RefCell<Vec<String>>>);

impl Wire {
    fn frames(&self) -> Vec<Value> {
        self.0.borrow().iter().filter_map(|f| serde_json::from_str(f).ok()).collect()
    }
}

impl Socket for Wire {
    fn send_text(&self, frame: &str) -> Result<(), ClientError> {
        self.0.borrow_mut().push(frame.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct Counts {
    frames: usize,
    towers: usize,
    creeps: usize,
    shots: usize,
}

impl DrawSurface for Counts {
    fn begin_frame(&mut self) {
        self.frames += 1;
    }
    fn draw_cell(&mut self, _cell: Cell, _style: CellStyle) {}
    fn draw_tower(&mut self, _tower: &TowerSnapshot) {
        self.towers += 1;
    }
    fn draw_creep(&mut self, _creep: &Creep) {
        self.creeps += 1;
    }
    fn draw_shot(&mut self, _shot: &Shot) {
        self.shots += 1;
    }
    fn end_frame(&mut self) {}
}

#[test]
fn place_tower_and_watch_it_fire() {
    let config = ClientConfig { greeting: None, ..ClientConfig::default() };
    let context = new_context();
    let wire = Wire::default();
    let channel = Rc::new(TransportChannel::open(wire.clone(), context.clone()));
    let grid = Rc::new(RefCell::new(Grid::new(config.grid, config.canvas)));
    let mut router = InputRouter::new(&config, grid.clone(), channel.clone());
    let mut scheduler = Scheduler::new(context.clone(), grid, PlayerModel::default());
    let mut surface = Counts::default();

    // Clicks before the socket opens are lost.
    router.press_tower_button(0);
    router.pointer_click(10.0, 10.0);
    assert!(wire.frames().is_empty());

    channel.handle_open();
    assert_eq!(channel.state(), ConnectionState::Open);
    router.pointer_click(175.0, 220.0);
    router.key_down(70);
    assert_eq!(
        wire.frames(),
        vec![
            json!({"type": "towerRequest", "id": 0, "msg": {"x": 3, "y": 4, "towerID": 0}}),
            json!({"type": "creepRequest", "id": 0, "msg": {"creepID": 0}}),
        ]
    );

    scheduler.tick(&mut surface);
    assert_eq!((surface.towers, surface.creeps, surface.shots), (0, 0, 0));

    channel.on_message(r#"{"type":"tower_update","towerAccepted":"true","tower":{"id":1,"x":3,"y":4,"towerID":0}}"#);
    channel.on_message(
        r#"{"type":"gameUpdate","playerState":{"lives":20},
            "creeps":[{"id":9,"x":5.0,"y":4.0}],"attacks":{"1":[9]}}"#,
    );
    channel.on_message("garbage");
    scheduler.tick(&mut surface);

    assert_eq!(surface.frames, 2);
    assert_eq!((surface.towers, surface.creeps, surface.shots), (1, 1, 1));
    assert_eq!(scheduler.model().applied(), 1);

    channel.handle_close();
    router.send_chat("bye");
    assert_eq!(wire.frames().len(), 2);
}

#[test]
fn wild_server_coordinates_do_not_stall_the_render_loop() {
    let config = ClientConfig::default();
    let context = new_context();
    let channel = TransportChannel::open(Wire::default(), context.clone());
    let grid = Rc::new(RefCell::new(Grid::new(config.grid, config.canvas)));
    let mut surface = PixelSurface::new(config.canvas.width, config.canvas.height, &grid.borrow());
    let mut scheduler = Scheduler::new(context, grid, PlayerModel::default());
    let white = Some((255, 255, 255));

    channel.on_message(r#"{"type":"tower_update","towerAccepted":true,"tower":{"id":1,"x":0,"y":0,"towerID":0}}"#);

    channel.on_message(r#"{"type":"gameUpdate","creeps":[{"id":9,"x":-1e12,"y":0.0}],"attacks":{"1":[9]}}"#);
    scheduler.tick(&mut surface);
    assert_eq!(surface.buffer().pixel_at(3, 25), white);

    channel.on_message(r#"{"type":"gameUpdate","creeps":[{"id":9,"x":3e7,"y":0.0}]}"#);
    scheduler.tick(&mut surface);
    assert_eq!(surface.buffer().pixel_at(720, 25), white);
    assert_eq!(surface.buffer().pixel_at(3, 25), surface.buffer().pixel_at(3, 200));
    assert_eq!(scheduler.ticks(), 2);
}
