//! Input line parsing: plain text or a slash command.

use std::fs;
use std::io;

use thiserror::Error;

use offload_base::conversation::ContentPart;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedInput {
    /// A user turn to submit
    Turn(Vec<ContentPart>),
    /// `/send`: dispatch turns deferred during the last generation
    SendPending,
    Load,
    Reset,
    Clear,
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("usage: /image <path> [prompt]")]
    MissingImagePath,
    #[error("cannot read image {path}: {source}")]
    ImageRead {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("unknown command /{0}")]
    UnknownCommand(String),
}

pub fn parse_input(input: &str) -> Result<ParsedInput, InputError> {
    let trimmed = input.trim();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Ok(ParsedInput::Turn(vec![ContentPart::Text(trimmed.to_string())]));
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };
    match name {
        "image" => parse_image(args),
        "send" => Ok(ParsedInput::SendPending),
        "load" => Ok(ParsedInput::Load),
        "reset" => Ok(ParsedInput::Reset),
        "clear" => Ok(ParsedInput::Clear),
        other => Err(InputError::UnknownCommand(other.to_string())),
    }
}

/// `/image <path> [prompt]`: image bytes first, then the optional prompt
fn parse_image(args: &str) -> Result<ParsedInput, InputError> {
    let (path, prompt) = match args.split_once(char::is_whitespace) {
        Some((path, prompt)) => (path, prompt.trim()),
        None => (args, ""),
    };
    if path.is_empty() {
        return Err(InputError::MissingImagePath);
    }
    let bytes = fs::read(path).map_err(|source| InputError::ImageRead { path: path.to_string(), source })?;

    let mut parts = vec![ContentPart::Image(bytes)];
    if !prompt.is_empty() {
        parts.push(ContentPart::Text(prompt.to_string()));
    }
    Ok(ParsedInput::Turn(parts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_turn() {
        let parsed = parse_input("  Translate: hello \n").unwrap();
        assert_eq!(parsed, ParsedInput::Turn(vec![ContentPart::Text("Translate: hello".into())]));
    }

    #[test]
    fn image_command_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cat.png");
        fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

        let parsed = parse_input(&format!("/image {} what is this?", path.display())).unwrap();
        assert_eq!(
            parsed,
            ParsedInput::Turn(vec![
                ContentPart::Image(vec![0x89, b'P', b'N', b'G']),
                ContentPart::Text("what is this?".into()),
            ])
        );
    }

    #[test]
    fn image_without_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.gif");
        fs::write(&path, b"GIF89a").unwrap();
        match parse_input(&format!("/image {}", path.display())).unwrap() {
            ParsedInput::Turn(parts) => assert_eq!(parts.len(), 1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn image_errors() {
        assert!(matches!(parse_input("/image"), Err(InputError::MissingImagePath)));
        let err = parse_input("/image /definitely/not/here.png").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.png"));
    }

    #[test]
    fn slash_commands() {
        assert_eq!(parse_input("/send").unwrap(), ParsedInput::SendPending);
        assert_eq!(parse_input("/load").unwrap(), ParsedInput::Load);
        assert!(matches!(parse_input("/teleport now"), Err(InputError::UnknownCommand(name)) if name == "teleport"));
    }
}
