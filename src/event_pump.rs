//! Pulls one event at a time out of `saphyr_parser` and enforces the
//! current state's acceptance mask before handing it to a state handler.

use saphyr_parser::{Event, Parser, StrInput};

use crate::error::LoadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EventKind {
    StreamStart,
    StreamEnd,
    DocStart,
    DocEnd,
    MappingStart,
    MappingEnd,
    SeqStart,
    SeqEnd,
    Scalar,
    Alias,
    Nothing,
}

impl EventKind {
    fn of(event: &Event) -> Self {
        match event {
            Event::StreamStart => EventKind::StreamStart,
            Event::StreamEnd => EventKind::StreamEnd,
            Event::DocumentStart(..) => EventKind::DocStart,
            Event::DocumentEnd => EventKind::DocEnd,
            Event::MappingStart(..) => EventKind::MappingStart,
            Event::MappingEnd => EventKind::MappingEnd,
            Event::SequenceStart(..) => EventKind::SeqStart,
            Event::SequenceEnd => EventKind::SeqEnd,
            Event::Scalar(..) => EventKind::Scalar,
            Event::Alias(_) => EventKind::Alias,
            Event::Nothing => EventKind::Nothing,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            EventKind::StreamStart => "stream start",
            EventKind::StreamEnd => "stream end",
            EventKind::DocStart => "document start",
            EventKind::DocEnd => "document end",
            EventKind::MappingStart => "mapping start",
            EventKind::MappingEnd => "mapping end",
            EventKind::SeqStart => "sequence start",
            EventKind::SeqEnd => "sequence end",
            EventKind::Scalar => "scalar",
            EventKind::Alias => "alias",
            EventKind::Nothing => "no event",
        }
    }
}

/// A bitmask of [`EventKind`]s acceptable in a given state.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EventMask(u16);

impl EventMask {
    pub(crate) const NONE: Self = Self(0);

    pub(crate) const fn with(self, kind: EventKind) -> Self {
        Self(self.0 | (1 << kind as u16))
    }

    fn accepts(self, kind: EventKind) -> bool {
        self.0 & (1 << kind as u16) != 0
    }
}

pub(crate) const VALUE_STARTS: EventMask = EventMask::NONE
    .with(EventKind::Scalar)
    .with(EventKind::MappingStart)
    .with(EventKind::SeqStart);

pub(crate) struct EventPump<'input> {
    parser: Parser<'input, StrInput<'input>>,
}

impl<'input> EventPump<'input> {
    pub(crate) fn new(input: &'input str) -> Self {
        Self {
            parser: Parser::new_from_str(input),
        }
    }

    /// Pulls the next event and checks it against `mask`, using `expected`
    /// only to build an error message.
    pub(crate) fn next(
        &mut self,
        mask: EventMask,
        expected: &'static str,
    ) -> Result<Event<'input>, LoadError> {
        let item = self
            .parser
            .next()
            .ok_or(LoadError::Internal("event stream ended without StreamEnd"))?;
        let (event, _span) = item?;
        let kind = EventKind::of(&event);
        if kind == EventKind::Alias {
            return Err(LoadError::Alias);
        }
        if !mask.accepts(kind) {
            return Err(LoadError::UnexpectedEvent {
                expected,
                found: kind.describe(),
            });
        }
        Ok(event)
    }
}
