pub mod beat;
pub mod effects;
pub mod events;
pub mod judgment;
pub mod music;
pub mod note;
pub mod notefield;
pub mod profile;
pub mod session;
pub mod sfx;
pub mod song;
pub mod spawner;
pub mod state;
pub mod ui;
