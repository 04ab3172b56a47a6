use serde::Deserialize;

use crate::error::ClientError;
use crate::protocol::{CreepEncoding, PlayerId};

pub const DEFAULT_ENDPOINT: &str = "ws://localhost:9000/";
pub const DEFAULT_TICKS_PER_SECOND: u32 = 60;
const KEY_ESCAPE: u32 = 27;

/// A key that activates a button, e.g. `{"label": "A", "key_code": 65}`.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Hotkey {
    pub label: String,
    pub key_code: u32,
}

impl Hotkey {
    pub fn new(label: &str, key_code: u32) -> Hotkey {
        Hotkey { label: label.to_string(), key_code }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ButtonSpec {
    pub name: String,
    pub hotkey: Hotkey,
}

impl ButtonSpec {
    pub fn new(name: &str, hotkey: Hotkey) -> ButtonSpec {
        ButtonSpec { name: name.to_string(), hotkey }
    }

    /// Button caption, `Name (Key)`.
    pub fn caption(&self) -> String {
        format!("{} ({})", self.name, self.hotkey.label)
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSize {
    pub columns: u32,
    pub rows: u32,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

/// Client settings. Every field has a default, so `{}` is a valid config.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub endpoint: String,
    pub player_id: PlayerId,
    pub ticks_per_second: u32,
    pub grid: GridSize,
    pub canvas: CanvasSize,
    pub canvas_id: String,
    pub tower_buttons: Vec<ButtonSpec>,
    pub creep_buttons: Vec<ButtonSpec>,
    /// Builds `Demolish` intents when set.
    pub demolish_button: Option<ButtonSpec>,
    pub disarm_key: Option<u32>,
    pub creep_encoding: CreepEncoding,
    /// Text frame sent once the socket opens.
    pub greeting: Option<String>,
    pub log_level: String,
    pub tower_buttons_id: String,
    pub creep_buttons_id: String,
    pub chatbox_id: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            player_id: PlayerId(0),
            ticks_per_second: DEFAULT_TICKS_PER_SECOND,
            grid: GridSize { columns: 16, rows: 12 },
            canvas: CanvasSize { width: 800, height: 600 },
            canvas_id: "gameFrame".to_string(),
            tower_buttons: vec![
                ButtonSpec::new("Archer Tower", Hotkey::new("A", 65)),
                ButtonSpec::new("Fire Tower", Hotkey::new("R", 82)),
                ButtonSpec::new("Ice Tower", Hotkey::new("I", 73)),
            ],
            creep_buttons: vec![
                ButtonSpec::new("Fast", Hotkey::new("F", 70)),
                ButtonSpec::new("Slow", Hotkey::new("S", 83)),
            ],
            demolish_button: None,
            disarm_key: Some(KEY_ESCAPE),
            creep_encoding: CreepEncoding::Structured,
            greeting: Some("I'm the client!".to_string()),
            log_level: "info".to_string(),
            tower_buttons_id: "towerButtons".to_string(),
            creep_buttons_id: "creepButtons".to_string(),
            chatbox_id: "chatbox".to_string(),
        }
    }
}

impl ClientConfig {
    /// Parses and validates a JSON config. Missing fields take defaults.
    pub fn from_json(raw: &str) -> Result<ClientConfig, ClientError> {
        let config: ClientConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.ticks_per_second == 0 {
            return Err(ClientError::Config("ticks_per_second must be positive".into()));
        }
        if self.grid.columns == 0 || self.grid.rows == 0 {
            return Err(ClientError::Config("grid must have at least one cell".into()));
        }
        if self.canvas.width < self.grid.columns || self.canvas.height < self.grid.rows {
            return Err(ClientError::Config("canvas is smaller than one pixel per cell".into()));
        }
        if self.log_level.parse::<tracing::Level>().is_err() {
            return Err(ClientError::Config(format!("unknown log level `{}`", self.log_level)));
        }
        Ok(())
    }

    /// Interval between ticks, rounded to whole milliseconds.
    pub fn tick_period_ms(&self) -> i32 {
        (1000.0 / self.ticks_per_second as f64).round().max(1.0) as i32
    }

    pub fn max_log_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = ClientConfig::from_json("{}").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.endpoint, "ws://localhost:9000/");
        assert_eq!(config.tick_period_ms(), 17);
    }

    #[test]
    fn overrides_are_applied() {
        let config = ClientConfig::from_json(
            r#"{"endpoint":"ws://example.test/game","player_id":4,
                "creep_encoding":"legacy","ticks_per_second":30,
                "creep_buttons":[{"name":"Tank","hotkey":{"label":"T","key_code":84}}]}"#,
        )
        .unwrap();
        assert_eq!(config.endpoint, "ws://example.test/game");
        assert_eq!(config.player_id, PlayerId(4));
        assert_eq!(config.creep_encoding, CreepEncoding::Legacy);
        assert_eq!(config.tick_period_ms(), 33);
        assert_eq!(config.creep_buttons[0].caption(), "Tank (T)");
        assert_eq!(config.tower_buttons.len(), 3);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            ClientConfig::from_json(r#"{"ticks_per_second":0}"#),
            Err(ClientError::Config(_))
        ));
        assert!(matches!(
            ClientConfig::from_json(r#"{"grid":{"columns":0,"rows":3}}"#),
            Err(ClientError::Config(_))
        ));
        assert!(matches!(
            ClientConfig::from_json(r#"{"log_level":"loud"}"#),
            Err(ClientError::Config(_))
        ));
        assert!(matches!(
            ClientConfig::from_json("{"),
            Err(ClientError::ConfigJson(_))
        ));
    }
}
