mod winit;

pub use self::winit::{key_text, translate_window_event};
