use eyre::{Result, bail};

/// Screen-space rectangle the target window will occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
}

/// A parsed `-g` geometry string. Every part is optional and falls back to
/// the screen rectangle when resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Geometry {
    pub width: Option<u16>,
    pub height: Option<u16>,
    pub x: Option<i16>,
    pub y: Option<i16>,
}

impl Geometry {
    /// Parse an X-style geometry string: `WxH`, `+X+Y`, `WxH+X+Y`, with an
    /// optional leading `=`. `-` offsets become negative coordinates.
    pub fn parse(input: &str) -> Result<Self> {
        let mut geometry = Geometry::default();
        let mut rest = input.strip_prefix('=').unwrap_or(input);

        if rest.starts_with(|c: char| c.is_ascii_digit()) {
            let Some((width, tail)) = take_number(rest) else {
                bail!("invalid geometry '{input}'");
            };
            geometry.width = Some(width);
            rest = tail;
            if let Some(tail) = rest.strip_prefix(['x', 'X']) {
                let Some((height, tail)) = take_number(tail) else {
                    bail!("invalid geometry '{input}'");
                };
                geometry.height = Some(height);
                rest = tail;
            }
        }

        if !rest.is_empty() {
            let Some((x, tail)) = take_offset(rest) else {
                bail!("invalid geometry '{input}'");
            };
            geometry.x = Some(x);
            rest = tail;
        }
        if !rest.is_empty() {
            let Some((y, tail)) = take_offset(rest) else {
                bail!("invalid geometry '{input}'");
            };
            geometry.y = Some(y);
            rest = tail;
        }
        if !rest.is_empty() {
            bail!("invalid geometry '{input}'");
        }

        Ok(geometry)
    }

    /// Fill in unspecified parts from the screen rectangle.
    pub fn resolve(self, screen: Rect) -> Rect {
        Rect {
            x: self.x.unwrap_or(screen.x),
            y: self.y.unwrap_or(screen.y),
            width: self.width.unwrap_or(screen.width),
            height: self.height.unwrap_or(screen.height),
        }
    }
}

fn take_number(s: &str) -> Option<(u16, &str)> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let value = s[..end].parse().ok()?;
    Some((value, &s[end..]))
}

fn take_offset(s: &str) -> Option<(i16, &str)> {
    let (negative, rest) = match s.as_bytes().first()? {
        b'+' => (false, &s[1..]),
        b'-' => (true, &s[1..]),
        _ => return None,
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let magnitude: i32 = rest[..end].parse().ok()?;
    let value = if negative { -magnitude } else { magnitude };
    Some((i16::try_from(value).ok()?, &rest[end..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: Rect = Rect {
        x: 0,
        y: 0,
        width: 1920,
        height: 1080,
    };

    #[test]
    fn test_full_geometry() {
        let rect = Geometry::parse("800x600+10+20").unwrap().resolve(SCREEN);
        assert_eq!(
            rect,
            Rect {
                x: 10,
                y: 20,
                width: 800,
                height: 600
            }
        );
    }

    #[test]
    fn test_size_only_keeps_screen_position() {
        let rect = Geometry::parse("640x480").unwrap().resolve(SCREEN);
        assert_eq!(
            rect,
            Rect {
                x: 0,
                y: 0,
                width: 640,
                height: 480
            }
        );
    }

    #[test]
    fn test_offsets_only_keep_screen_size() {
        let rect = Geometry::parse("+100+200").unwrap().resolve(SCREEN);
        assert_eq!(
            rect,
            Rect {
                x: 100,
                y: 200,
                width: 1920,
                height: 1080
            }
        );
    }

    #[test]
    fn test_negative_offsets() {
        let rect = Geometry::parse("300x300-5-15").unwrap().resolve(SCREEN);
        assert_eq!(rect.x, -5);
        assert_eq!(rect.y, -15);
    }

    #[test]
    fn test_equals_prefix_and_lone_width() {
        let geometry = Geometry::parse("=800").unwrap();
        assert_eq!(geometry.width, Some(800));
        assert_eq!(geometry.height, None);
    }

    #[test]
    fn test_empty_string_resolves_to_screen() {
        let rect = Geometry::parse("").unwrap().resolve(SCREEN);
        assert_eq!(rect, SCREEN);
    }

    #[test]
    fn test_malformed_geometry_is_rejected() {
        for input in ["abc", "800x", "800x600+", "800x600+1+2junk", "99999x100"] {
            assert!(Geometry::parse(input).is_err(), "accepted '{input}'");
        }
    }
}
