//! Browser wiring: WebSocket callbacks, canvas blitting, DOM listeners and
//! the `setInterval` tick. Everything registered here lives for the life of
//! the page, so closures are `forget`-ed.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::convert::FromWasmAbi;
use wasm_bindgen::{Clamped, JsCast};
use web_sys::{
    CanvasRenderingContext2d, CloseEvent, Document, ErrorEvent, HtmlCanvasElement, HtmlInputElement,
    ImageData, KeyboardEvent, MessageEvent, MouseEvent, WebSocket, Window,
};

use crate::config::{ButtonSpec, ClientConfig};
use crate::error::ClientError;
use crate::grid::Grid;
use crate::input::InputRouter;
use crate::protocol::{Cell, PlayerId, TowerSnapshot};
use crate::render::{CellStyle, DrawSurface, PixelSurface, Shot};
use crate::scheduler::{PlayerModel, Scheduler};
use crate::state::{new_context, Creep, GameContext};
use crate::transport::{ConnectionState, Socket, TransportChannel};

// --- SOCKET ---

pub struct BrowserSocket(WebSocket);

impl Socket for BrowserSocket {
    fn send_text(&self, frame: &str) -> Result<(), ClientError> {
        self.0.send_with_str(frame).map_err(ClientError::socket)
    }
}

pub type BrowserChannel = TransportChannel<BrowserSocket>;

fn connect(config: &ClientConfig, context: GameContext) -> Result<Rc<BrowserChannel>, ClientError> {
    let ws = WebSocket::new(&config.endpoint).map_err(ClientError::socket)?;
    let channel = Rc::new(
        TransportChannel::open(BrowserSocket(ws.clone()), context).with_greeting(config.greeting.clone()),
    );

    {
        let channel = channel.clone();
        let onopen = Closure::wrap(Box::new(move || channel.handle_open()) as Box<dyn FnMut()>);
        ws.set_onopen(Some(onopen.as_ref().unchecked_ref()));
        onopen.forget();
    }
    {
        let channel = channel.clone();
        let onclose = Closure::wrap(Box::new(move |_: CloseEvent| channel.handle_close()) as Box<dyn FnMut(CloseEvent)>);
        ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));
        onclose.forget();
    }
    {
        let onerror = Closure::wrap(Box::new(move |e: ErrorEvent| {
            warn!("WebSocket error: {}", e.message());
        }) as Box<dyn FnMut(ErrorEvent)>);
        ws.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        onerror.forget();
    }
    {
        let channel = channel.clone();
        let onmessage = Closure::wrap(Box::new(move |e: MessageEvent| match e.data().dyn_into::<js_sys::JsString>() {
            Ok(text) => channel.on_message(&String::from(text)),
            Err(_) => debug!("ignoring non-text frame"),
        }) as Box<dyn FnMut(MessageEvent)>);
        ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
        onmessage.forget();
    }

    info!("connecting to {}", config.endpoint);
    Ok(channel)
}

// --- CANVAS ---

/// Rasterizes into a pixel buffer and blits it when the frame ends.
struct CanvasTarget {
    context: CanvasRenderingContext2d,
    surface: PixelSurface,
}

impl DrawSurface for CanvasTarget {
    fn begin_frame(&mut self) {
        self.surface.begin_frame();
    }

    fn draw_cell(&mut self, cell: Cell, style: CellStyle) {
        self.surface.draw_cell(cell, style);
    }

    fn draw_tower(&mut self, tower: &TowerSnapshot) {
        self.surface.draw_tower(tower);
    }

    fn draw_creep(&mut self, creep: &Creep) {
        self.surface.draw_creep(creep);
    }

    fn draw_shot(&mut self, shot: &Shot) {
        self.surface.draw_shot(shot);
    }

    fn end_frame(&mut self) {
        self.surface.end_frame();
        let buffer = self.surface.buffer();
        let blit = ImageData::new_with_u8_clamped_array_and_sh(Clamped(buffer.pixels()), buffer.width(), buffer.height())
            .and_then(|image| self.context.put_image_data(&image, 0.0, 0.0));
        if let Err(e) = blit {
            warn!("frame blit failed: {:?}", e);
        }
    }
}

fn canvas(document: &Document, config: &ClientConfig) -> Result<(HtmlCanvasElement, CanvasRenderingContext2d), ClientError> {
    let canvas = document
        .get_element_by_id(&config.canvas_id)
        .ok_or_else(|| ClientError::Dom(format!("no #{} on the page", config.canvas_id)))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| ClientError::Dom(format!("#{} is not a canvas", config.canvas_id)))?;

    canvas.set_width(config.canvas.width);
    canvas.set_height(config.canvas.height);

    let context = canvas
        .get_context("2d")
        .map_err(ClientError::dom)?
        .ok_or_else(|| ClientError::Dom("canvas has no 2d context".into()))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(|_| ClientError::Dom("unexpected 2d context type".into()))?;

    Ok((canvas, context))
}

/// Canvas top-left in page coordinates.
fn page_offset(window: &Window, canvas: &HtmlCanvasElement) -> (f32, f32) {
    let rect = canvas.get_bounding_client_rect();
    let scroll_x = window.scroll_x().unwrap_or(0.0);
    let scroll_y = window.scroll_y().unwrap_or(0.0);
    ((rect.left() + scroll_x) as f32, (rect.top() + scroll_y) as f32)
}

// --- DOM INPUT ---

fn listen<E: FromWasmAbi + 'static>(
    target: &web_sys::EventTarget,
    event: &str,
    handler: impl FnMut(E) + 'static,
) -> Result<(), ClientError> {
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(E)>);
    target
        .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
        .map_err(ClientError::dom)?;
    closure.forget();
    Ok(())
}

fn bind_pointer(
    window: &Window,
    canvas: &HtmlCanvasElement,
    grid: &Rc<RefCell<Grid>>,
    router: &Rc<RefCell<InputRouter>>,
) -> Result<(), ClientError> {
    {
        let router = router.clone();
        listen(canvas, "mousemove", move |event: MouseEvent| {
            router.borrow_mut().pointer_move(event.page_x() as f32, event.page_y() as f32);
        })?;
    }
    {
        let router = router.clone();
        listen(canvas, "click", move |event: MouseEvent| {
            if let Some(cell) = router.borrow_mut().pointer_click(event.page_x() as f32, event.page_y() as f32) {
                debug!(x = cell.x, y = cell.y, "tower request");
            }
        })?;
    }
    {
        let grid = grid.clone();
        let canvas = canvas.clone();
        let win = window.clone();
        listen(window, "resize", move |_: web_sys::Event| {
            let (left, top) = page_offset(&win, &canvas);
            grid.borrow_mut().set_offset(left, top);
        })?;
    }
    Ok(())
}

fn bind_keys(document: &Document, router: &Rc<RefCell<InputRouter>>) -> Result<(), ClientError> {
    let router = router.clone();
    listen(document, "keydown", move |event: KeyboardEvent| {
        router.borrow_mut().key_down(event.key_code());
    })
}

#[derive(Clone, Copy)]
enum Family {
    Tower,
    Creep,
}

fn build_buttons(
    document: &Document,
    container_id: &str,
    specs: &[&ButtonSpec],
    family: Family,
    router: &Rc<RefCell<InputRouter>>,
) -> Result<(), ClientError> {
    let Some(container) = document.get_element_by_id(container_id) else {
        warn!("no #{} on the page, skipping its buttons", container_id);
        return Ok(());
    };

    for (index, spec) in specs.iter().enumerate() {
        let button = document
            .create_element("input")
            .map_err(ClientError::dom)?
            .dyn_into::<HtmlInputElement>()
            .map_err(|_| ClientError::Dom("could not create button".into()))?;
        button.set_type("button");
        button.set_value(&spec.caption());
        button.set_class_name("sideButton");

        let router = router.clone();
        listen(&button, "click", move |_: MouseEvent| match family {
            Family::Tower => router.borrow_mut().press_tower_button(index),
            Family::Creep => router.borrow_mut().press_creep_button(index),
        })?;
        container.append_child(&button).map_err(ClientError::dom)?;
    }
    Ok(())
}

/// Appends chat lines to the chat box when the page has one.
fn chat_display(document: Document, chatbox_id: String) -> impl FnMut(PlayerId, &str) {
    move |id: PlayerId, text: &str| {
        let Some(chatbox) = document.get_element_by_id(&chatbox_id) else {
            return;
        };
        match document.create_element("div") {
            Ok(line) => {
                line.set_text_content(Some(&format!("{}: {}", id.0, text)));
                if let Err(e) = chatbox.append_child(&line) {
                    warn!("chat append failed: {:?}", e);
                }
            }
            Err(e) => warn!("chat line failed: {:?}", e),
        }
    }
}

// --- TICK ---

fn start_interval(window: &Window, period_ms: i32, mut tick: impl FnMut() + 'static) -> Result<(), ClientError> {
    let closure = Closure::wrap(Box::new(move || tick()) as Box<dyn FnMut()>);
    window
        .set_interval_with_callback_and_timeout_and_arguments_0(closure.as_ref().unchecked_ref(), period_ms)
        .map_err(ClientError::dom)?;
    closure.forget();
    Ok(())
}

// --- ENTRY ---

/// Handle returned to the page.
#[wasm_bindgen]
pub struct ClientHandle {
    channel: Rc<BrowserChannel>,
    router: Rc<RefCell<InputRouter>>,
}

#[wasm_bindgen]
impl ClientHandle {
    pub fn send_chat(&self, text: &str) {
        self.router.borrow().send_chat(text);
    }

    pub fn connection_state(&self) -> String {
        match self.channel.state() {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
        }
        .to_string()
    }

    pub fn disarm(&self) {
        self.router.borrow_mut().disarm();
    }
}

pub(crate) fn start(config: ClientConfig) -> Result<ClientHandle, ClientError> {
    let window = web_sys::window().ok_or_else(|| ClientError::Dom("no global `window`".into()))?;
    let document = window.document().ok_or_else(|| ClientError::Dom("window has no document".into()))?;

    let (canvas, context2d) = canvas(&document, &config)?;
    let grid = Rc::new(RefCell::new(Grid::new(config.grid, config.canvas)));
    {
        let (left, top) = page_offset(&window, &canvas);
        grid.borrow_mut().set_offset(left, top);
    }

    let context = new_context();
    let channel = connect(&config, context.clone())?;
    channel.on_chat(chat_display(document.clone(), config.chatbox_id.clone()));

    let router = Rc::new(RefCell::new(InputRouter::new(&config, grid.clone(), channel.clone())));
    bind_pointer(&window, &canvas, &grid, &router)?;
    bind_keys(&document, &router)?;

    let tower_specs: Vec<&ButtonSpec> = config.tower_buttons.iter().chain(config.demolish_button.as_ref()).collect();
    let creep_specs: Vec<&ButtonSpec> = config.creep_buttons.iter().collect();
    build_buttons(&document, &config.tower_buttons_id, &tower_specs, Family::Tower, &router)?;
    build_buttons(&document, &config.creep_buttons_id, &creep_specs, Family::Creep, &router)?;

    let mut target = CanvasTarget {
        context: context2d,
        surface: PixelSurface::new(config.canvas.width, config.canvas.height, &grid.borrow()),
    };
    let mut scheduler = Scheduler::new(context, grid, PlayerModel::default());
    start_interval(&window, config.tick_period_ms(), move || scheduler.tick(&mut target))?;
    info!(period_ms = config.tick_period_ms(), "render loop started");

    Ok(ClientHandle { channel, router })
}
