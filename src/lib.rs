pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod images;
pub mod page;
pub mod preload;
pub mod slideshow;
pub mod tasks {
    pub mod input;
    pub mod loader;
    pub mod view;
}
