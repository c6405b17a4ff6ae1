use super::sign_registry::SignImageRegistry;

/// One input character, classified against the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Token {
    /// A character with a gesture image in the registry (always lowercase).
    Glyph(char),
    /// Whitespace, punctuation, or a letter/digit with no image.
    Placeholder,
}

impl Token {
    pub fn is_glyph(&self) -> bool {
        matches!(self, Token::Glyph(_))
    }
}

/// Lowercases `text`, then maps each resulting character to a token in
/// order. A character whose lowercase form is several characters yields
/// one token per character.
///
/// Never fails: characters without an image become [`Token::Placeholder`].
pub fn normalize(text: &str, registry: &SignImageRegistry) -> Vec<Token> {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match registry.lookup(c) {
            Some(image) => Token::Glyph(image.key()),
            None => Token::Placeholder,
        })
        .collect()
}
