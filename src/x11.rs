use std::env;

use eyre::{Result, eyre};
use x11rb::connection::Connection;
use x11rb::properties::{WmHints, WmSizeHints, WmSizeHintsSpecification};
use x11rb::protocol::shape::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{
    AtomEnum, ClipOrdering, ConnectionExt as _, CreateWindowAux, MapState, PropMode, Screen,
    Window, WindowClass,
};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use crate::geometry::Rect;

x11rb::atom_manager! {
    Atoms: AtomsCookie {
        _NET_WM_STATE,
        _NET_WM_STATE_BELOW,
    }
}

/// Connection to the X server plus the default screen.
pub struct Display {
    conn: RustConnection,
    screen_num: usize,
}

impl Display {
    /// Connect to the display named by the environment. A display server is
    /// a hard prerequisite; failure here is fatal and not retried.
    pub fn open() -> Result<Self> {
        let (conn, screen_num) =
            x11rb::connect(None).map_err(|error| eyre!("could not open display: {error}"))?;
        Ok(Self { conn, screen_num })
    }

    fn screen(&self) -> &Screen {
        &self.conn.setup().roots[self.screen_num]
    }

    /// The full rectangle of the default screen.
    pub fn screen_rect(&self) -> Rect {
        let screen = self.screen();
        Rect {
            x: 0,
            y: 0,
            width: screen.width_in_pixels,
            height: screen.height_in_pixels,
        }
    }

    /// Search the direct children of root for the desktop surface: a named,
    /// mapped window exactly filling the screen. One level only; no match
    /// is not an error.
    fn find_desktop_window(&self) -> Result<Option<Window>> {
        let screen = self.screen();
        let screen_size = (screen.width_in_pixels, screen.height_in_pixels);
        let tree = self.conn.query_tree(screen.root)?.reply()?;

        let mut candidates = Vec::with_capacity(tree.children.len());
        for &child in &tree.children {
            let name = self
                .conn
                .get_property(false, child, AtomEnum::WM_NAME, AtomEnum::ANY, 0, 1)?
                .reply();
            let attributes = self.conn.get_window_attributes(child)?.reply();
            let geometry = self.conn.get_geometry(child)?.reply();
            // A window may vanish between the tree query and these
            // lookups; skip it rather than fail the scan.
            let (Ok(name), Ok(attributes), Ok(geometry)) = (name, attributes, geometry) else {
                continue;
            };
            candidates.push(Candidate {
                window: child,
                named: name.format != 0,
                mapped: attributes.map_state != MapState::UNMAPPED,
                size: (geometry.width, geometry.height),
            });
        }

        Ok(pick_desktop(&candidates, screen_size))
    }

    /// Create the override-redirect target window at `rect`, configure it
    /// to be click-through and stacked below normal windows, and leave it
    /// mapped and realized on screen.
    pub fn place_window(&self, rect: Rect) -> Result<TargetWindow<'_>> {
        let atoms = Atoms::new(&self.conn)?.reply()?;
        let root = self.screen().root;
        let parent = self.find_desktop_window()?.unwrap_or(root);

        let window = self.conn.generate_id()?;
        self.conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            window,
            parent,
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            0,
            WindowClass::INPUT_OUTPUT,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new().override_redirect(1),
        )?;

        // WM metadata: fixed size, no keyboard focus, and our own command
        // line for introspection by window managers and tools.
        let mut size_hints = WmSizeHints::new();
        size_hints.size = Some((
            WmSizeHintsSpecification::ProgramSpecified,
            i32::from(rect.width),
            i32::from(rect.height),
        ));
        size_hints.set_normal_hints(&self.conn, window)?;

        let mut wm_hints = WmHints::new();
        wm_hints.input = Some(false);
        wm_hints.set(&self.conn, window)?;

        let command_line: Vec<u8> = env::args()
            .flat_map(|argument| {
                let mut bytes = argument.into_bytes();
                bytes.push(0);
                bytes
            })
            .collect();
        self.conn.change_property8(
            PropMode::REPLACE,
            window,
            AtomEnum::WM_COMMAND,
            AtomEnum::STRING,
            &command_line,
        )?;

        // Empty input shape: every pointer event passes through to
        // whatever is beneath.
        self.conn.shape_rectangles(
            shape::SO::SET,
            shape::SK::INPUT,
            ClipOrdering::UNSORTED,
            window,
            0,
            0,
            &[],
        )?;

        self.conn.change_property32(
            PropMode::REPLACE,
            window,
            atoms._NET_WM_STATE,
            AtomEnum::ATOM,
            &[atoms._NET_WM_STATE_BELOW],
        )?;

        self.conn.map_window(window)?;

        // Round-trip so the window is realized before the child starts
        // drawing into it.
        self.conn.get_input_focus()?.reply()?;

        Ok(TargetWindow {
            display: self,
            window,
        })
    }
}

/// The mapped surface handed to the child process. Destroyed on drop, which
/// on the normal path runs only after the child has terminated.
pub struct TargetWindow<'a> {
    display: &'a Display,
    window: Window,
}

impl TargetWindow<'_> {
    /// The window handle formatted the way the child expects it on its
    /// command line.
    pub fn handle_token(&self) -> String {
        format!("0x{:x}", self.window)
    }
}

impl Drop for TargetWindow<'_> {
    fn drop(&mut self) {
        let _ = self.display.conn.destroy_window(self.window);
        let _ = self.display.conn.flush();
    }
}

struct Candidate {
    window: Window,
    named: bool,
    mapped: bool,
    size: (u16, u16),
}

/// The first named, mapped, exactly screen-sized candidate is the desktop.
fn pick_desktop(candidates: &[Candidate], screen_size: (u16, u16)) -> Option<Window> {
    candidates
        .iter()
        .find(|candidate| candidate.named && candidate.mapped && candidate.size == screen_size)
        .map(|candidate| candidate.window)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: (u16, u16) = (1920, 1080);

    fn candidate(window: Window, named: bool, mapped: bool, size: (u16, u16)) -> Candidate {
        Candidate {
            window,
            named,
            mapped,
            size,
        }
    }

    #[test]
    fn test_full_screen_named_mapped_window_is_desktop() {
        let candidates = [
            candidate(0x10, true, true, (200, 100)),
            candidate(0x11, true, true, SCREEN),
        ];
        assert_eq!(pick_desktop(&candidates, SCREEN), Some(0x11));
    }

    #[test]
    fn test_first_match_wins() {
        let candidates = [
            candidate(0x20, true, true, SCREEN),
            candidate(0x21, true, true, SCREEN),
        ];
        assert_eq!(pick_desktop(&candidates, SCREEN), Some(0x20));
    }

    #[test]
    fn test_unnamed_or_unmapped_windows_are_skipped() {
        let candidates = [
            candidate(0x30, false, true, SCREEN),
            candidate(0x31, true, false, SCREEN),
        ];
        assert_eq!(pick_desktop(&candidates, SCREEN), None);
    }

    #[test]
    fn test_size_must_match_exactly() {
        let candidates = [candidate(0x40, true, true, (1920, 1079))];
        assert_eq!(pick_desktop(&candidates, SCREEN), None);
    }

    #[test]
    fn test_no_candidates_no_desktop() {
        assert_eq!(pick_desktop(&[], SCREEN), None);
    }
}
