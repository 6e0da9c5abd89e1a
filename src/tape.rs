//! Tapes with a fixed left boundary that grow on demand to the right.

use crate::types::{Direction, MachineError, TAPE_BLOCK_SIZE};

/// A single tape and its head.
///
/// Cells are materialized in blocks of `TAPE_BLOCK_SIZE` blanks, so a head can always read the cell
/// it stands on. The tape never shrinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tape {
    cells: Vec<char>,
    head: usize,
    /// One past the furthest cell that was seeded or visited.
    extent: usize,
    blank: char,
}

impl Tape {
    /// Creates a tape holding `content` followed by blanks, with the head on the first cell.
    pub fn new(content: &str, blank: char) -> Self {
        let mut cells: Vec<char> = content.chars().collect();
        let extent = cells.len().max(1);
        cells.resize(cells.len() + TAPE_BLOCK_SIZE, blank);

        Self {
            cells,
            head: 0,
            extent,
            blank,
        }
    }

    /// Creates an all-blank tape.
    pub fn blank(blank: char) -> Self {
        Self::new("", blank)
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn blank_symbol(&self) -> char {
        self.blank
    }

    /// Returns the symbol under the head.
    pub fn read(&self) -> char {
        self.cells[self.head]
    }

    /// Overwrites the symbol under the head.
    pub fn write(&mut self, symbol: char) {
        self.cells[self.head] = symbol;
    }

    /// Moves the head one cell. Moving left from position 0 leaves the head where it is.
    pub fn shift(&mut self, direction: Direction) {
        match direction {
            Direction::Left => self.head = self.head.saturating_sub(1),
            Direction::Right => self.head += 1,
            Direction::Stay => {}
        }

        if self.head >= self.cells.len() {
            self.cells.resize(self.head + TAPE_BLOCK_SIZE, self.blank);
        }
        self.extent = self.extent.max(self.head + 1);
    }

    /// Returns the cells from position 0 up to the furthest cell seeded or visited.
    pub fn visited(&self) -> &[char] {
        &self.cells[..self.extent]
    }

    /// Returns the tape as a string from position 0.
    ///
    /// With `trim_blanks` the string stops at the last non-blank symbol; otherwise it spans every
    /// visited cell. The tape itself is not modified.
    pub fn content(&self, trim_blanks: bool) -> String {
        let cells = self.visited();
        let end = if trim_blanks {
            cells
                .iter()
                .rposition(|&c| c != self.blank)
                .map_or(0, |last| last + 1)
        } else {
            cells.len()
        };

        cells[..end].iter().collect()
    }

    /// Number of cells currently materialized, including the pre-allocated blank run.
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }
}

/// The N tapes of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapeSet {
    tapes: Vec<Tape>,
}

impl TapeSet {
    /// Seeds `count` tapes. Tapes without a matching entry in `contents` start blank.
    ///
    /// # Errors
    ///
    /// Returns `MachineError::InvalidTapeIndex` if more contents than tapes are supplied.
    pub fn new<S: AsRef<str>>(
        count: usize,
        contents: &[S],
        blank: char,
    ) -> Result<Self, MachineError> {
        if contents.len() > count {
            return Err(MachineError::InvalidTapeIndex {
                index: count,
                tape_count: count,
            });
        }

        let tapes = (0..count)
            .map(|i| match contents.get(i) {
                Some(content) => Tape::new(content.as_ref(), blank),
                None => Tape::blank(blank),
            })
            .collect();

        Ok(Self { tapes })
    }

    pub fn len(&self) -> usize {
        self.tapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tapes.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&Tape, MachineError> {
        self.tapes.get(index).ok_or(MachineError::InvalidTapeIndex {
            index,
            tape_count: self.tapes.len(),
        })
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut Tape, MachineError> {
        let tape_count = self.tapes.len();
        self.tapes
            .get_mut(index)
            .ok_or(MachineError::InvalidTapeIndex { index, tape_count })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tape> {
        self.tapes.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Tape> {
        self.tapes.iter_mut()
    }

    /// Returns the symbols under every head, in tape order.
    pub fn read(&self) -> Vec<char> {
        self.tapes.iter().map(Tape::read).collect()
    }

    pub fn heads(&self) -> Vec<usize> {
        self.tapes.iter().map(Tape::head).collect()
    }
}
