//! Real input backend: enigo for the pointer and keyboard, global-hotkey for
//! OS-level combos.
//!
//! Both libraries hold handles that must stay on the thread that created
//! them, so each runs on a dedicated worker fed by a channel.

use std::{collections::HashMap, result::Result as StdResult, sync::Arc, thread};

use async_trait::async_trait;
use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use enigo::{Enigo, Key, KeyboardControllable, MouseButton, MouseControllable};
use global_hotkey::{
    GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState,
    hotkey::{Code, HotKey, Modifiers},
};
use keymap::{Combo, KeyId, Modifier};
use mouser_engine::{HotkeyApi, HotkeyCallback, Platform, PlatformError, PlatformOp, Point};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};

/// One request for the input worker.
#[derive(Debug)]
enum InputRequest {
    /// Move the pointer.
    Move(Point),
    /// Left click.
    Click,
    /// Tap a key.
    Key(KeyId),
    /// Read the pointer.
    Location,
}

/// Request plus its reply slot.
struct InputJob {
    /// What to do.
    req: InputRequest,
    /// Where the outcome goes.
    reply: oneshot::Sender<StdResult<Point, PlatformError>>,
}

/// Pointer and keyboard driven through enigo.
pub struct DesktopPlatform {
    /// Queue into the worker thread.
    jobs: Sender<InputJob>,
}

impl DesktopPlatform {
    /// Spawn the input worker.
    pub fn spawn() -> Result<Self> {
        let (jobs, rx) = unbounded::<InputJob>();
        thread::Builder::new()
            .name("mouser-input".into())
            .spawn(move || input_worker(&rx))
            .map_err(|e| Error::Backend(format!("input worker: {e}")))?;
        Ok(Self { jobs })
    }

    /// Submit `req` and wait for the worker.
    async fn call(&self, op: PlatformOp, req: InputRequest) -> StdResult<Point, PlatformError> {
        let (reply, rx) = oneshot::channel();
        self.jobs
            .send(InputJob { req, reply })
            .map_err(|_| PlatformError::new(op, "input worker stopped"))?;
        rx.await
            .map_err(|_| PlatformError::new(op, "input worker dropped the request"))?
    }
}

/// Serve input jobs until every sender is gone.
fn input_worker(rx: &Receiver<InputJob>) {
    let mut enigo = Enigo::new();
    for InputJob { req, reply } in rx {
        trace!(?req, "input_job");
        let out = match req {
            InputRequest::Move(at) => {
                enigo.mouse_move_to(at.x, at.y);
                Ok(at)
            }
            InputRequest::Click => {
                enigo.mouse_click(MouseButton::Left);
                Ok(Point::default())
            }
            InputRequest::Key(key) => {
                enigo.key_click(enigo_key(key));
                Ok(Point::default())
            }
            InputRequest::Location => {
                let (x, y) = enigo.mouse_location();
                Ok(Point::new(x, y))
            }
        };
        if reply.send(out).is_err() {
            debug!("input_reply_dropped");
        }
    }
    debug!("input_worker_exited");
}

/// Translate a key identity for enigo.
fn enigo_key(key: KeyId) -> Key {
    match key {
        KeyId::Enter => Key::Return,
        KeyId::Escape => Key::Escape,
        KeyId::Space => Key::Space,
        KeyId::Tab => Key::Tab,
        KeyId::LeftShift => Key::Shift,
        KeyId::LeftControl => Key::Control,
        KeyId::LeftAlt => Key::Alt,
        KeyId::LeftSuper => Key::Meta,
        KeyId::Up => Key::UpArrow,
        KeyId::Down => Key::DownArrow,
        KeyId::Left => Key::LeftArrow,
        KeyId::Right => Key::RightArrow,
        KeyId::Backspace => Key::Backspace,
        KeyId::Delete => Key::Delete,
        KeyId::F1 => Key::F1,
        KeyId::F2 => Key::F2,
        KeyId::F3 => Key::F3,
        KeyId::F4 => Key::F4,
        KeyId::F5 => Key::F5,
        KeyId::F6 => Key::F6,
        KeyId::F7 => Key::F7,
        KeyId::F8 => Key::F8,
        KeyId::F9 => Key::F9,
        KeyId::F10 => Key::F10,
        KeyId::F11 => Key::F11,
        KeyId::F12 => Key::F12,
        letter_or_digit => Key::Layout(letter_or_digit.as_char().unwrap_or_default()),
    }
}

#[async_trait]
impl Platform for DesktopPlatform {
    async fn set_cursor(&self, at: Point) -> StdResult<(), PlatformError> {
        self.call(PlatformOp::SetCursor, InputRequest::Move(at)).await.map(drop)
    }

    async fn click(&self) -> StdResult<(), PlatformError> {
        self.call(PlatformOp::Click, InputRequest::Click).await.map(drop)
    }

    async fn send_key(&self, key: KeyId) -> StdResult<(), PlatformError> {
        self.call(PlatformOp::SendKey, InputRequest::Key(key)).await.map(drop)
    }

    async fn cursor(&self) -> StdResult<Point, PlatformError> {
        self.call(PlatformOp::QueryCursor, InputRequest::Location).await
    }
}

/// Requests for the hotkey manager thread.
enum ManagerRequest {
    /// Register, replying with success.
    Register(HotKey, Sender<bool>),
    /// Unregister.
    Unregister(HotKey),
}

/// OS-level hotkeys through global-hotkey.
///
/// Some platforms only deliver events to a thread running a native message
/// loop; a terminal process may therefore register combos that never fire.
pub struct DesktopHotkeys {
    /// Queue into the manager thread.
    manager: Sender<ManagerRequest>,
    /// Callbacks by hotkey id.
    callbacks: Arc<Mutex<HashMap<u32, HotkeyCallback>>>,
}

impl DesktopHotkeys {
    /// Spawn the manager and event pump threads.
    pub fn spawn() -> Result<Self> {
        let (manager, rx) = unbounded::<ManagerRequest>();
        let (ready_tx, ready_rx) = bounded::<StdResult<(), String>>(1);
        thread::Builder::new()
            .name("mouser-hotkeys".into())
            .spawn(move || manager_worker(&rx, &ready_tx))
            .map_err(|e| Error::Backend(format!("hotkey manager: {e}")))?;
        ready_rx
            .recv()
            .map_err(|_| Error::Backend("hotkey manager exited during startup".into()))?
            .map_err(Error::Backend)?;

        let callbacks: Arc<Mutex<HashMap<u32, HotkeyCallback>>> = Arc::default();
        let pump = callbacks.clone();
        thread::Builder::new()
            .name("mouser-hotkey-events".into())
            .spawn(move || {
                for event in GlobalHotKeyEvent::receiver() {
                    if event.state != HotKeyState::Pressed {
                        continue;
                    }
                    if let Some(cb) = pump.lock().get(&event.id) {
                        cb();
                    }
                }
            })
            .map_err(|e| Error::Backend(format!("hotkey event pump: {e}")))?;
        Ok(Self { manager, callbacks })
    }
}

/// Own the manager and serve requests.
fn manager_worker(rx: &Receiver<ManagerRequest>, ready: &Sender<StdResult<(), String>>) {
    let manager = match GlobalHotKeyManager::new() {
        Ok(m) => m,
        Err(e) => {
            if ready.send(Err(e.to_string())).is_err() {
                debug!("hotkey_ready_dropped");
            }
            return;
        }
    };
    if ready.send(Ok(())).is_err() {
        return;
    }
    for req in rx {
        match req {
            ManagerRequest::Register(hk, reply) => {
                let ok = match manager.register(hk) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(error = %e, "hotkey_register_failed");
                        false
                    }
                };
                if reply.send(ok).is_err() {
                    debug!("hotkey_reply_dropped");
                }
            }
            ManagerRequest::Unregister(hk) => {
                if let Err(e) = manager.unregister(hk) {
                    debug!(error = %e, "hotkey_unregister_failed");
                }
            }
        }
    }
}

/// Translate a combo for global-hotkey.
fn hotkey_for(combo: &Combo) -> HotKey {
    let mut mods = Modifiers::empty();
    for m in &combo.modifiers {
        mods |= match m {
            Modifier::Control => Modifiers::CONTROL,
            Modifier::Shift => Modifiers::SHIFT,
            Modifier::Alt => Modifiers::ALT,
            Modifier::Super => Modifiers::SUPER,
        };
    }
    let mods = (!mods.is_empty()).then_some(mods);
    HotKey::new(mods, code_for(combo.key))
}

/// Physical key code for `key`.
fn code_for(key: KeyId) -> Code {
    match key {
        KeyId::A => Code::KeyA,
        KeyId::B => Code::KeyB,
        KeyId::C => Code::KeyC,
        KeyId::D => Code::KeyD,
        KeyId::E => Code::KeyE,
        KeyId::F => Code::KeyF,
        KeyId::G => Code::KeyG,
        KeyId::H => Code::KeyH,
        KeyId::I => Code::KeyI,
        KeyId::J => Code::KeyJ,
        KeyId::K => Code::KeyK,
        KeyId::L => Code::KeyL,
        KeyId::M => Code::KeyM,
        KeyId::N => Code::KeyN,
        KeyId::O => Code::KeyO,
        KeyId::P => Code::KeyP,
        KeyId::Q => Code::KeyQ,
        KeyId::R => Code::KeyR,
        KeyId::S => Code::KeyS,
        KeyId::T => Code::KeyT,
        KeyId::U => Code::KeyU,
        KeyId::V => Code::KeyV,
        KeyId::W => Code::KeyW,
        KeyId::X => Code::KeyX,
        KeyId::Y => Code::KeyY,
        KeyId::Z => Code::KeyZ,
        KeyId::Num0 => Code::Digit0,
        KeyId::Num1 => Code::Digit1,
        KeyId::Num2 => Code::Digit2,
        KeyId::Num3 => Code::Digit3,
        KeyId::Num4 => Code::Digit4,
        KeyId::Num5 => Code::Digit5,
        KeyId::Num6 => Code::Digit6,
        KeyId::Num7 => Code::Digit7,
        KeyId::Num8 => Code::Digit8,
        KeyId::Num9 => Code::Digit9,
        KeyId::F1 => Code::F1,
        KeyId::F2 => Code::F2,
        KeyId::F3 => Code::F3,
        KeyId::F4 => Code::F4,
        KeyId::F5 => Code::F5,
        KeyId::F6 => Code::F6,
        KeyId::F7 => Code::F7,
        KeyId::F8 => Code::F8,
        KeyId::F9 => Code::F9,
        KeyId::F10 => Code::F10,
        KeyId::F11 => Code::F11,
        KeyId::F12 => Code::F12,
        KeyId::Enter => Code::Enter,
        KeyId::Escape => Code::Escape,
        KeyId::Space => Code::Space,
        KeyId::Tab => Code::Tab,
        KeyId::LeftShift => Code::ShiftLeft,
        KeyId::LeftControl => Code::ControlLeft,
        KeyId::LeftAlt => Code::AltLeft,
        KeyId::LeftSuper => Code::MetaLeft,
        KeyId::Up => Code::ArrowUp,
        KeyId::Down => Code::ArrowDown,
        KeyId::Left => Code::ArrowLeft,
        KeyId::Right => Code::ArrowRight,
        KeyId::Backspace => Code::Backspace,
        KeyId::Delete => Code::Delete,
    }
}

impl HotkeyApi for DesktopHotkeys {
    fn register(&self, combo: &Combo, on_press: HotkeyCallback) -> bool {
        let hk = hotkey_for(combo);
        if self.callbacks.lock().contains_key(&hk.id()) {
            return false;
        }
        let (reply, rx) = bounded(1);
        if self.manager.send(ManagerRequest::Register(hk, reply)).is_err() {
            return false;
        }
        let ok = rx.recv().unwrap_or(false);
        if ok {
            self.callbacks.lock().insert(hk.id(), on_press);
            debug!(combo = %combo, "desktop_hotkey_bound");
        }
        ok
    }

    fn unregister(&self, combo: &Combo) {
        let hk = hotkey_for(combo);
        if self.callbacks.lock().remove(&hk.id()).is_none() {
            return;
        }
        if self.manager.send(ManagerRequest::Unregister(hk)).is_err() {
            debug!(combo = %combo, "hotkey_manager_gone");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_key_maps_to_enigo() {
        assert_eq!(enigo_key(KeyId::A), Key::Layout('a'));
        assert_eq!(enigo_key(KeyId::Num7), Key::Layout('7'));
        assert_eq!(enigo_key(KeyId::Enter), Key::Return);
        assert_eq!(enigo_key(KeyId::F12), Key::F12);
    }

    #[test]
    fn combos_map_to_distinct_hotkeys() {
        let start = hotkey_for(&Combo::parse("ctrl+shift+f9").expect("combo"));
        let stop = hotkey_for(&Combo::parse("ctrl+shift+f10").expect("combo"));
        assert_eq!(start, HotKey::new(Some(Modifiers::CONTROL | Modifiers::SHIFT), Code::F9));
        assert_ne!(start.id(), stop.id());
        assert_eq!(
            hotkey_for(&Combo::parse("enter").expect("combo")),
            HotKey::new(None, Code::Enter)
        );
    }
}
