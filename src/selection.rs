//! The two button families behave differently and are kept as separate
//! machines: tower buttons arm an intent (toggle on the same button,
//! replace on a different one); creep buttons fire immediately and keep no
//! state.

use crate::protocol::{CreepEncoding, OutboundRequest, PlayerId, TowerIntent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TowerSelection {
    #[default]
    Unarmed,
    Armed(TowerIntent),
}

impl TowerSelection {
    /// Pressing the armed button disarms; any other button takes over.
    pub fn press(&mut self, intent: TowerIntent) {
        *self = match *self {
            TowerSelection::Armed(armed) if armed == intent => TowerSelection::Unarmed,
            _ => TowerSelection::Armed(intent),
        };
    }

    pub fn armed(&self) -> Option<TowerIntent> {
        match self {
            TowerSelection::Armed(intent) => Some(*intent),
            TowerSelection::Unarmed => None,
        }
    }

    pub fn clear(&mut self) {
        *self = TowerSelection::Unarmed;
    }
}

/// Creep buttons: every activation is one request, whatever came before.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreepLauncher {
    encoding: CreepEncoding,
}

impl CreepLauncher {
    pub fn new(encoding: CreepEncoding) -> CreepLauncher {
        CreepLauncher { encoding }
    }

    pub fn fire(&self, player: PlayerId, kind: usize) -> OutboundRequest {
        OutboundRequest::creep(player, kind, self.encoding)
    }
}
