pub mod directory_loader;
pub mod letter_caption;
