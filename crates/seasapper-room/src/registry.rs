//! Room registry: maps room codes to running room actors.

use std::collections::HashMap;

use seasapper_protocol::{RoomClosedReason, RoomCode};

use crate::actor::spawn_room;
use crate::{RoomConfig, RoomHandle};

/// Every live room in this process, keyed by code.
///
/// Not a singleton: the server owns one behind a lock and tests build
/// their own.
pub struct RoomRegistry {
    config: RoomConfig,
    rooms: HashMap<RoomCode, RoomHandle>,
}

impl RoomRegistry {
    pub fn new(config: RoomConfig) -> Self {
        Self {
            config,
            rooms: HashMap::new(),
        }
    }

    /// Returns the room for `code`, spawning it on first use.
    ///
    /// A room whose actor already stopped is replaced.
    pub fn get_or_create_room(&mut self, code: &RoomCode) -> RoomHandle {
        if let Some(handle) = self.rooms.get(code) {
            if !handle.is_closed() {
                return handle.clone();
            }
            tracing::debug!(room_code = %code, "replacing stopped room");
        }
        let handle = spawn_room(code.clone(), self.config.clone());
        self.rooms.insert(code.clone(), handle.clone());
        tracing::info!(room_code = %code, rooms = self.rooms.len(), "room created");
        handle
    }

    pub fn get_room(&self, code: &RoomCode) -> Option<RoomHandle> {
        self.rooms.get(code).cloned()
    }

    /// Drops the room if nobody is connected and no grace timer is running.
    ///
    /// Returns `true` if the room was removed (or was already gone).
    pub async fn remove_room_if_empty(&mut self, code: &RoomCode) -> bool {
        let Some(handle) = self.rooms.get(code) else {
            return true;
        };
        match handle.get_info().await {
            Ok(info) if !info.is_idle() => return false,
            Ok(_) => {
                let _ = handle.shutdown(RoomClosedReason::Server).await;
            }
            Err(_) => {}
        }
        self.rooms.remove(code);
        tracing::info!(room_code = %code, rooms = self.rooms.len(), "room removed");
        true
    }

    pub fn active_room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Removes every idle room. Returns how many were dropped.
    pub async fn sweep_idle(&mut self) -> usize {
        let codes: Vec<RoomCode> = self.rooms.keys().cloned().collect();
        let mut removed = 0;
        for code in codes {
            if self.remove_room_if_empty(&code).await {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::info!(removed, remaining = self.rooms.len(), "idle rooms swept");
        }
        removed
    }

    /// Closes every room with `reason`, waits for each to stop, and empties
    /// the registry.
    pub async fn shutdown_all(&mut self, reason: RoomClosedReason) {
        tracing::info!(rooms = self.rooms.len(), ?reason, "closing all rooms");
        for (_, handle) in self.rooms.drain() {
            if handle.shutdown(reason).await.is_ok() {
                handle.stopped().await;
            }
        }
    }
}
