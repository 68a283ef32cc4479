//! The three screens of a play session.
//!
//! - `Loadout`: pick character, theme, accessory and modifier; start a run
//!   once the selected assets are loaded.
//! - `Game`: the live run, pause menu and the second-chance prompt.
//! - `GameOver`: results and mission popup; run again or go back.

mod game;
mod game_over;
mod loadout;

pub use game::GameState;
pub use game_over::GameOverState;
pub use loadout::LoadoutState;
