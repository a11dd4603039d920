//! In-game emulation menu
//!
//! The drawer and panels shown over a running game. Every entry is a
//! [`MenuAction`]; [`EmulationMenu::apply`] turns one into session calls
//! and tells the host what to do next.

use crate::session::Session;
use crate::state::SessionState;

/// Menu entries, plus the host's back gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    TogglePause,
    SaveStates,
    OverlayOptions,
    Amiibo,
    SwitchLayout,
    SwapScreens,
    RotateUpright,
    OpenCheats,
    Settings,
    CloseGame,
    ConfirmClose,
    CancelClose,
    Back,
}

/// Screens the host navigates to on request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    OverlayOptions,
    Amiibo,
    Cheats,
    Settings,
}

/// Screen layout changes the host applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenAdjustment {
    SwapScreens,
    RotateUpright,
}

/// What the host should do after a menu action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOutcome {
    /// Session state after the action
    State(SessionState),
    /// Ask the user to confirm closing the game
    ConfirmClose,
    Navigate(Destination),
    Adjust(ScreenAdjustment),
    /// Drawer or panel visibility changed
    Panels,
}

/// One drawer entry as the host lists it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuItem {
    pub action: MenuAction,
    pub label: &'static str,
}

/// Drawer entries in display order
const DRAWER: [MenuAction; 10] = [
    MenuAction::TogglePause,
    MenuAction::SaveStates,
    MenuAction::OverlayOptions,
    MenuAction::Amiibo,
    MenuAction::SwitchLayout,
    MenuAction::SwapScreens,
    MenuAction::RotateUpright,
    MenuAction::OpenCheats,
    MenuAction::Settings,
    MenuAction::CloseGame,
];

/// Menu state for one session
pub struct EmulationMenu {
    session: Session,
    drawer_open: bool,
    save_states_open: bool,
    layout_open: bool,
}

impl EmulationMenu {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            drawer_open: false,
            save_states_open: false,
            layout_open: false,
        }
    }

    pub fn is_drawer_open(&self) -> bool {
        self.drawer_open
    }

    pub fn is_save_states_open(&self) -> bool {
        self.save_states_open
    }

    pub fn is_layout_open(&self) -> bool {
        self.layout_open
    }

    /// Drawer entries, labelled for the current pause state
    pub fn items(&self) -> Vec<MenuItem> {
        let paused = self.session.is_paused();
        DRAWER
            .iter()
            .map(|&action| MenuItem {
                action,
                label: label(action, paused),
            })
            .collect()
    }

    pub fn apply(&mut self, action: MenuAction) -> MenuOutcome {
        tracing::debug!("Menu action {:?}", action);
        match action {
            MenuAction::TogglePause => {
                self.session.toggle_pause();
                MenuOutcome::State(self.session.state())
            }
            MenuAction::SaveStates => {
                self.drawer_open = false;
                self.save_states_open = true;
                MenuOutcome::Panels
            }
            MenuAction::OverlayOptions => MenuOutcome::Navigate(Destination::OverlayOptions),
            MenuAction::Amiibo => MenuOutcome::Navigate(Destination::Amiibo),
            MenuAction::SwitchLayout => {
                self.drawer_open = false;
                self.layout_open = true;
                MenuOutcome::Panels
            }
            MenuAction::SwapScreens => MenuOutcome::Adjust(ScreenAdjustment::SwapScreens),
            MenuAction::RotateUpright => MenuOutcome::Adjust(ScreenAdjustment::RotateUpright),
            MenuAction::OpenCheats => MenuOutcome::Navigate(Destination::Cheats),
            MenuAction::Settings => MenuOutcome::Navigate(Destination::Settings),
            MenuAction::CloseGame => {
                if self.session.request_close() {
                    MenuOutcome::ConfirmClose
                } else {
                    MenuOutcome::State(self.session.state())
                }
            }
            MenuAction::ConfirmClose => {
                self.session.confirm_close();
                MenuOutcome::State(self.session.state())
            }
            MenuAction::CancelClose => {
                self.session.cancel_close();
                MenuOutcome::State(self.session.state())
            }
            MenuAction::Back => {
                // Innermost first
                if self.drawer_open {
                    self.drawer_open = false;
                } else if self.save_states_open {
                    self.save_states_open = false;
                } else if self.layout_open {
                    self.layout_open = false;
                } else {
                    self.drawer_open = true;
                }
                MenuOutcome::Panels
            }
        }
    }
}

fn label(action: MenuAction, paused: bool) -> &'static str {
    match action {
        MenuAction::TogglePause if paused => "Resume Emulation",
        MenuAction::TogglePause => "Pause Emulation",
        MenuAction::SaveStates => "Save States",
        MenuAction::OverlayOptions => "Overlay Options",
        MenuAction::Amiibo => "Amiibo",
        MenuAction::SwitchLayout => "Change Screen Layout",
        MenuAction::SwapScreens => "Swap Screens",
        MenuAction::RotateUpright => "Rotate Screen Upright",
        MenuAction::OpenCheats => "Open Cheats",
        MenuAction::Settings => "Settings",
        MenuAction::CloseGame => "Close Game",
        MenuAction::ConfirmClose => "OK",
        MenuAction::CancelClose => "Cancel",
        MenuAction::Back => "Back",
    }
}
