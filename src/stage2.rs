//! Stage 2: the structural parser. Walks the stage-1 index array through a
//! goto-style state machine, validating the grammar and emitting tape words
//! as it goes. Scope openers are reserved on entry and back-patched once on
//! exit with the closer's index and the saturating child count.

use crate::safer_unchecked::GetSaferUnchecked;
use crate::tape::{COUNT_SATURATION, TapeType, TapeWriter};
use crate::{Document, Error, ErrorType, PADDING, Parser, Result};
use crate::{atomparse, numberparse, stringparse};

macro_rules! get {
    ($a:expr, $i:expr) => {{ unsafe { $a.get_kinda_unchecked($i) } }};
}

macro_rules! get_mut {
    ($a:expr, $i:expr) => {{ unsafe { $a.get_kinda_unchecked_mut($i) } }};
}

macro_rules! log_event {
    ($($args:tt)*) => {
        #[cfg(feature = "logging")]
        log::trace!($($args)*);
    };
}

/// One open scope: where its reserved opener word sits and how many children
/// it has seen so far.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ScopeDescriptor {
    pub(crate) tape_index: u32,
    pub(crate) count: u32,
}

/// Where to resume once the scope at the same depth closes. The three-way
/// continuation of the state machine; a small enum in place of computed
/// goto.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum RetAddress {
    ArrayContinue,
    ObjectContinue,
    #[default]
    Finish,
}

#[derive(Debug)]
enum State {
    ObjectBegin,
    ObjectKey,
    ObjectContinue,
    ArrayBegin,
    ArrayValue,
    ArrayContinue,
    ScopeEnd,
}

impl Parser {
    /// Run stage 2 over the currently indexed input, filling `doc`.
    ///
    /// With `STREAMING == false` the parse starts at the first structural
    /// and a root array must have the document's last structural byte as its
    /// `]`. With `STREAMING == true` the parse starts at
    /// `next_structural_index`, the root-array check is skipped, and on
    /// success the index is left one past the consumed document so the next
    /// call picks up the following one.
    #[allow(
        clippy::cognitive_complexity,
        clippy::too_many_lines,
        clippy::cast_possible_truncation
    )]
    pub fn parse_structurals<const STREAMING: bool>(&mut self, doc: &mut Document) -> Result<()> {
        doc.clear();
        doc.tape.reserve(2 * self.structural_indexes.len() + 4);
        doc.string_buf.reserve(self.len + PADDING);

        let len = self.len;
        let max_depth = self.max_depth;

        let Parser {
            ref input_buffer,
            ref structural_indexes,
            ref mut containing_scope,
            ref mut ret_address,
            ref mut next_structural_index,
            ref mut error,
            ..
        } = *self;
        let buf: &[u8] = input_buffer;

        let Document {
            tape: ref mut tape_vec,
            ref mut string_buf,
        } = *doc;
        let mut tape = TapeWriter::new(tape_vec);

        // Number of open scopes; the document root counts as one.
        let mut depth: usize = 0;
        // Cursor into `structural_indexes`: the next entry to consume.
        let mut i: usize = if STREAMING { *next_structural_index } else { 0 };
        // Byte offset of the current structural.
        let mut idx: usize = 0;
        // The current structural byte itself.
        let mut c: u8 = 0;

        *error = ErrorType::Uninitialized;

        macro_rules! fail {
            () => {{
                let e = if depth >= max_depth {
                    ErrorType::DepthError
                } else {
                    match c {
                        b'"' => ErrorType::StringError,
                        b'-' | b'0'..=b'9' => ErrorType::NumberError,
                        b't' => ErrorType::TrueAtomError,
                        b'f' => ErrorType::FalseAtomError,
                        b'n' => ErrorType::NullAtomError,
                        _ => ErrorType::TapeError,
                    }
                };
                fail!(e)
            }};
            ($t:expr) => {{
                let e = $t;
                *error = e;
                log_event!("stage 2 error {:?} at byte {}", e, idx);
                return Err(Error::new_c(idx, c as char, e));
            }};
        }

        macro_rules! update_char {
            () => {
                if likely!(i < structural_indexes.len()) {
                    idx = *get!(structural_indexes, i) as usize;
                    i += 1;
                    c = *get!(buf, idx);
                } else {
                    // ran out of structurals mid-document
                    fail!(ErrorType::TapeError)
                }
            };
        }

        macro_rules! peek_char {
            () => {
                if likely!(i < structural_indexes.len()) {
                    *get!(buf, *get!(structural_indexes, i) as usize)
                } else {
                    fail!(ErrorType::TapeError)
                }
            };
        }

        macro_rules! goto {
            ($state_var:ident, $state:expr) => {{
                $state_var = $state;
                continue;
            }};
        }

        macro_rules! start_scope {
            ($ret:expr) => {
                *get_mut!(containing_scope, depth) = ScopeDescriptor {
                    tape_index: tape.next_index() as u32,
                    count: 0,
                };
                // the opener is only written at scope close, reserve its slot
                tape.skip();
                *get_mut!(ret_address, depth) = $ret;
                depth += 1;
                if unlikely!(depth >= max_depth) {
                    fail!(ErrorType::DepthError)
                }
            };
        }

        macro_rules! end_scope {
            ($start:expr, $end:expr) => {
                depth -= 1;
                let scope = *get!(containing_scope, depth);
                // the closer goes down first, so `end_index` is its own slot
                let end_index = tape.next_index() as u64;
                tape.append(u64::from(scope.tape_index), $end);
                let count = u64::from(scope.count.min(COUNT_SATURATION));
                tape.back_patch(scope.tape_index as usize, end_index | (count << 32), $start);
                log_event!("close {:?}, {} children", $start, count);
            };
        }

        macro_rules! increment_count {
            () => {
                // children are counted in the scope that contains them
                get_mut!(containing_scope, depth - 1).count += 1;
            };
        }

        macro_rules! parse_string {
            () => {
                let prefix_offset = string_buf.len();
                tape.append(prefix_offset as u64, TapeType::String);
                // length prefix is finalized once the body size is known
                string_buf.extend_from_slice(&[0u8; 4]);
                let body_start = string_buf.len();
                if unlikely!(stringparse::parse_str(buf, len, idx, string_buf).is_err()) {
                    fail!()
                }
                let body_len = (string_buf.len() - body_start) as u32;
                get_mut!(string_buf, prefix_offset..prefix_offset + 4)
                    .copy_from_slice(&body_len.to_le_bytes());
                string_buf.push(0);
            };
        }

        macro_rules! parse_number {
            () => {
                if unlikely!(numberparse::parse_number(buf, idx, &mut tape).is_err()) {
                    fail!()
                }
            };
        }

        macro_rules! parse_root_number {
            () => {
                // The padding of the input copy may hold NULs, and a NUL
                // terminates nothing: `9` as a whole document must parse
                // while `9\0` inside one must not. Re-pad with spaces.
                let mut copy = vec![b' '; len + PADDING];
                get_mut!(copy, ..len).copy_from_slice(get!(buf, ..len));
                if unlikely!(numberparse::parse_number(&copy, idx, &mut tape).is_err()) {
                    fail!()
                }
            };
        }

        macro_rules! parse_true {
            () => {
                if unlikely!(!atomparse::is_valid_true_atom(get!(buf, idx..))) {
                    fail!()
                }
                tape.append(0, TapeType::True);
            };
        }

        macro_rules! parse_false {
            () => {
                if unlikely!(!atomparse::is_valid_false_atom(get!(buf, idx..))) {
                    fail!()
                }
                tape.append(0, TapeType::False);
            };
        }

        macro_rules! parse_null {
            () => {
                if unlikely!(!atomparse::is_valid_null_atom(get!(buf, idx..))) {
                    fail!()
                }
                tape.append(0, TapeType::Null);
            };
        }

        macro_rules! parse_root_true {
            () => {
                if unlikely!(!atomparse::is_valid_root_true_atom(get!(buf, idx..), len - idx)) {
                    fail!()
                }
                tape.append(0, TapeType::True);
            };
        }

        macro_rules! parse_root_false {
            () => {
                if unlikely!(!atomparse::is_valid_root_false_atom(get!(buf, idx..), len - idx)) {
                    fail!()
                }
                tape.append(0, TapeType::False);
            };
        }

        macro_rules! parse_root_null {
            () => {
                if unlikely!(!atomparse::is_valid_root_null_atom(get!(buf, idx..), len - idx)) {
                    fail!()
                }
                tape.append(0, TapeType::Null);
            };
        }

        macro_rules! finish {
            () => {{
                end_scope!(TapeType::Root, TapeType::Root);
                *next_structural_index = i;
                if unlikely!(depth != 0) {
                    fail!(ErrorType::TapeError)
                }
                *error = ErrorType::Success;
                log_event!("document done, {} tape words", tape.next_index());
                return Ok(());
            }};
        }

        if unlikely!(i >= structural_indexes.len()) {
            *error = ErrorType::Empty;
            return Err(Error::generic(ErrorType::Empty));
        }

        log_event!("stage 2 start, {} structurals", structural_indexes.len());

        // the document root is a scope like any other, resumed at finish
        start_scope!(RetAddress::Finish);

        update_char!();
        let mut state = match c {
            b'{' => {
                start_scope!(RetAddress::Finish);
                State::ObjectBegin
            }
            b'[' => {
                start_scope!(RetAddress::Finish);
                if !STREAMING {
                    // An outer array that never closes could walk the machine
                    // past the document; reject it before parsing content.
                    let last = *get!(structural_indexes, structural_indexes.len() - 1) as usize;
                    if unlikely!(*get!(buf, last) != b']') {
                        fail!(ErrorType::TapeError)
                    }
                }
                State::ArrayBegin
            }
            b'"' => {
                parse_string!();
                finish!()
            }
            b't' => {
                parse_root_true!();
                finish!()
            }
            b'f' => {
                parse_root_false!();
                finish!()
            }
            b'n' => {
                parse_root_null!();
                finish!()
            }
            b'-' | b'0'..=b'9' => {
                parse_root_number!();
                finish!()
            }
            _ => fail!(),
        };

        loop {
            match state {
                State::ObjectBegin => {
                    update_char!();
                    match c {
                        b'"' => {
                            increment_count!();
                            parse_string!();
                            goto!(state, State::ObjectKey)
                        }
                        b'}' => {
                            end_scope!(TapeType::StartObject, TapeType::EndObject);
                            goto!(state, State::ScopeEnd)
                        }
                        _ => fail!(),
                    }
                }

                State::ObjectKey => {
                    update_char!();
                    if unlikely!(c != b':') {
                        fail!()
                    }
                    update_char!();
                    match c {
                        b'{' => {
                            start_scope!(RetAddress::ObjectContinue);
                            goto!(state, State::ObjectBegin)
                        }
                        b'[' => {
                            start_scope!(RetAddress::ObjectContinue);
                            goto!(state, State::ArrayBegin)
                        }
                        b'"' => {
                            parse_string!();
                            goto!(state, State::ObjectContinue)
                        }
                        b't' => {
                            parse_true!();
                            goto!(state, State::ObjectContinue)
                        }
                        b'f' => {
                            parse_false!();
                            goto!(state, State::ObjectContinue)
                        }
                        b'n' => {
                            parse_null!();
                            goto!(state, State::ObjectContinue)
                        }
                        b'-' | b'0'..=b'9' => {
                            parse_number!();
                            goto!(state, State::ObjectContinue)
                        }
                        _ => fail!(),
                    }
                }

                State::ObjectContinue => {
                    update_char!();
                    match c {
                        b',' => {
                            increment_count!();
                            update_char!();
                            if unlikely!(c != b'"') {
                                fail!()
                            }
                            parse_string!();
                            goto!(state, State::ObjectKey)
                        }
                        b'}' => {
                            end_scope!(TapeType::StartObject, TapeType::EndObject);
                            goto!(state, State::ScopeEnd)
                        }
                        _ => fail!(),
                    }
                }

                State::ArrayBegin => {
                    if peek_char!() == b']' {
                        update_char!();
                        end_scope!(TapeType::StartArray, TapeType::EndArray);
                        goto!(state, State::ScopeEnd)
                    }
                    increment_count!();
                    goto!(state, State::ArrayValue)
                }

                State::ArrayValue => {
                    update_char!();
                    match c {
                        b'{' => {
                            start_scope!(RetAddress::ArrayContinue);
                            goto!(state, State::ObjectBegin)
                        }
                        b'[' => {
                            start_scope!(RetAddress::ArrayContinue);
                            goto!(state, State::ArrayBegin)
                        }
                        b'"' => {
                            parse_string!();
                            goto!(state, State::ArrayContinue)
                        }
                        b't' => {
                            parse_true!();
                            goto!(state, State::ArrayContinue)
                        }
                        b'f' => {
                            parse_false!();
                            goto!(state, State::ArrayContinue)
                        }
                        b'n' => {
                            parse_null!();
                            goto!(state, State::ArrayContinue)
                        }
                        b'-' | b'0'..=b'9' => {
                            parse_number!();
                            goto!(state, State::ArrayContinue)
                        }
                        _ => fail!(),
                    }
                }

                State::ArrayContinue => {
                    update_char!();
                    match c {
                        b',' => {
                            increment_count!();
                            goto!(state, State::ArrayValue)
                        }
                        b']' => {
                            end_scope!(TapeType::StartArray, TapeType::EndArray);
                            goto!(state, State::ScopeEnd)
                        }
                        _ => fail!(),
                    }
                }

                State::ScopeEnd => {
                    // resume whatever the parent of the closed scope was doing
                    match *get!(ret_address, depth) {
                        RetAddress::ArrayContinue => goto!(state, State::ArrayContinue),
                        RetAddress::ObjectContinue => goto!(state, State::ObjectContinue),
                        RetAddress::Finish => finish!(),
                    }
                }
            }
        }
    }
}
