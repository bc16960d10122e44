//! The per-state event handlers and the drive loop that ties them together.
//!
//! Each handler consumes exactly one event and advances the stack by at
//! most one push or pop. The drive loop dispatches on the top frame's state
//! until the stack unwinds back to the `Start` sentinel, meaning
//! `StreamEnd` was consumed.

use saphyr_parser::Event;

use crate::config::{Config, LogLevel};
use crate::error::LoadError;
use crate::event_pump::{EventKind, EventMask, EventPump, VALUE_STARTS};
use crate::frame::{Frame, FrameState, MappingFrame, MappingSubState, SequenceFrame, Stack};
use crate::placement;
use crate::scalar;
use crate::schema::{Schema, SchemaFlags, SchemaKind};

pub(crate) fn drive(
    root_schema: &'static Schema,
    root_data: *mut u8,
    pump: &mut EventPump,
    config: &Config,
) -> Result<(), LoadError> {
    let mut stack = Stack::new();
    stack.push(Frame {
        state: FrameState::Start,
        schema: root_schema,
        data: root_data,
    });

    loop {
        if let Err(err) = step(&mut stack, pump) {
            config.log(LogLevel::Error, || err.to_string());
            return Err(err);
        }
        // The initial push above leaves the stack in exactly this shape, so
        // the check only means "stream closed" once at least one step (the
        // one consuming `StreamStart`) has run.
        if stack.depth() == 1 && matches!(stack.get(0).state, FrameState::Start) {
            break;
        }
    }

    stack.pop()?;
    debug_assert_eq!(stack.depth(), 0);
    Ok(())
}

fn step(stack: &mut Stack, pump: &mut EventPump) -> Result<(), LoadError> {
    let idx = stack.top_index()?;
    match &stack.get(idx).state {
        FrameState::Start => handle_start(stack, pump, idx),
        FrameState::InStream => handle_in_stream(stack, pump, idx),
        FrameState::InDoc => handle_in_doc(stack, pump, idx),
        FrameState::InMapping(m) => {
            if matches!(m.sub_state, MappingSubState::ExpectKey) {
                handle_mapping_key(stack, pump, idx)
            } else {
                handle_mapping_value(stack, pump, idx)
            }
        }
        FrameState::InSequence(_) => handle_sequence_element(stack, pump, idx),
    }
}

fn handle_start(stack: &mut Stack, pump: &mut EventPump, idx: usize) -> Result<(), LoadError> {
    let event = pump.next(EventMask::NONE.with(EventKind::StreamStart), "stream start")?;
    debug_assert!(matches!(event, Event::StreamStart));
    let frame = stack.get(idx);
    stack.push(Frame {
        state: FrameState::InStream,
        schema: frame.schema,
        data: frame.data,
    });
    Ok(())
}

fn handle_in_stream(stack: &mut Stack, pump: &mut EventPump, idx: usize) -> Result<(), LoadError> {
    let mask = EventMask::NONE
        .with(EventKind::DocStart)
        .with(EventKind::StreamEnd);
    let event = pump.next(mask, "document start or stream end")?;
    match event {
        Event::DocumentStart(..) => {
            let frame = stack.get(idx);
            stack.push(Frame {
                state: FrameState::InDoc,
                schema: frame.schema,
                data: frame.data,
            });
            Ok(())
        }
        Event::StreamEnd => {
            stack.pop()?;
            Ok(())
        }
        _ => unreachable!("mask admits only DocumentStart and StreamEnd"),
    }
}

fn handle_in_doc(stack: &mut Stack, pump: &mut EventPump, idx: usize) -> Result<(), LoadError> {
    let mask = EventMask::NONE
        .with(EventKind::MappingStart)
        .with(EventKind::DocEnd);
    let event = pump.next(mask, "top-level mapping or document end")?;
    match event {
        Event::MappingStart(..) => {
            let frame = stack.get(idx);
            let SchemaKind::Mapping { fields } = &frame.schema.kind else {
                return Err(LoadError::BadTopLevelType);
            };
            let schema = frame.schema;
            let data = frame.data;
            stack.push(Frame {
                state: FrameState::InMapping(MappingFrame {
                    fields,
                    seen: vec![false; fields.len()],
                    sub_state: MappingSubState::ExpectKey,
                }),
                schema,
                data,
            });
            Ok(())
        }
        Event::DocumentEnd => {
            stack.pop()?;
            Ok(())
        }
        _ => unreachable!("mask admits only MappingStart and DocumentEnd"),
    }
}

fn handle_mapping_key(stack: &mut Stack, pump: &mut EventPump, idx: usize) -> Result<(), LoadError> {
    let mask = EventMask::NONE
        .with(EventKind::Scalar)
        .with(EventKind::MappingEnd);
    let event = pump.next(mask, "mapping key or mapping end")?;
    match event {
        Event::Scalar(text, ..) => {
            let key = text.as_ref();
            let frame = stack.get_mut(idx);
            let FrameState::InMapping(m) = &mut frame.state else {
                unreachable!("dispatched from InMapping")
            };
            let field_index = m
                .fields
                .iter()
                .position(|f| f.key == key)
                .ok_or_else(|| LoadError::InvalidKey(key.to_string()))?;
            if m.seen[field_index] {
                return Err(LoadError::InvalidKey(key.to_string()));
            }
            m.seen[field_index] = true;
            m.sub_state = MappingSubState::ExpectValue { field_index };
            Ok(())
        }
        Event::MappingEnd => {
            stack.pop()?;
            Ok(())
        }
        _ => unreachable!("mask admits only Scalar and MappingEnd"),
    }
}

fn handle_mapping_value(stack: &mut Stack, pump: &mut EventPump, idx: usize) -> Result<(), LoadError> {
    let event = pump.next(VALUE_STARTS, "mapping value")?;

    let frame = stack.get_mut(idx);
    let FrameState::InMapping(m) = &mut frame.state else {
        unreachable!("dispatched from InMapping")
    };
    let MappingSubState::ExpectValue { field_index } = m.sub_state else {
        unreachable!("dispatched from ExpectValue")
    };
    m.sub_state = MappingSubState::ExpectKey;
    let field = &m.fields[field_index];
    let field_schema = field.schema;
    let parent_base = frame.data;
    let target = unsafe { frame.data.add(field.offset) };

    dispatch_value(stack, field_schema, target, parent_base, event)
}

fn handle_sequence_element(stack: &mut Stack, pump: &mut EventPump, idx: usize) -> Result<(), LoadError> {
    let mask = VALUE_STARTS.with(EventKind::SeqEnd);
    let event = pump.next(mask, "sequence element or sequence end")?;
    if matches!(event, Event::SequenceEnd) {
        stack.pop()?;
        return Ok(());
    }

    let frame = stack.get_mut(idx);
    let FrameState::InSequence(seq) = &mut frame.state else {
        unreachable!("dispatched from InSequence")
    };
    let element = seq.element;
    let slot = append_sequence_slot(seq)?;

    dispatch_value(stack, element, slot, slot, event)
}

/// Grows (or indexes into, for `SequenceFixed`) the element storage and
/// returns the address of the newly available slot.
fn append_sequence_slot(seq: &mut SequenceFrame) -> Result<*mut u8, LoadError> {
    if let Some(capacity) = seq.fixed_capacity {
        if seq.count >= capacity {
            return Err(LoadError::InvalidValue(format!(
                "sequence has more than its fixed capacity of {capacity} elements"
            )));
        }
        let slot = unsafe { seq.storage.add(seq.count * seq.element.size) };
        seq.count += 1;
        return Ok(slot);
    }

    let old_size = seq.element.size * seq.count;
    let new_size = seq.element.size * (seq.count + 1);
    let grown = unsafe { placement::grow_block(seq.storage, old_size, new_size)? };
    seq.storage = grown;
    if let Some(slot) = seq.pointer_slot {
        unsafe { placement::write_pointer(slot, grown) };
    }
    seq.count += 1;
    if let Some((addr, width)) = seq.count_field {
        unsafe { placement::write_int(addr, width, seq.count as i64) };
    }
    Ok(unsafe { seq.storage.add((seq.count - 1) * seq.element.size) })
}

/// The shared value handler: given a schema node, the address it should be
/// written at (or, for pointer-owning fields, the address of the pointer
/// slot), the base of the aggregate the value's offsets are resolved
/// against, and the event that introduced the value, place it and push a
/// new frame if it is an aggregate.
fn dispatch_value(
    stack: &mut Stack,
    schema: &'static Schema,
    target: *mut u8,
    parent_base: *mut u8,
    event: Event,
) -> Result<(), LoadError> {
    match &schema.kind {
        SchemaKind::Int { .. }
        | SchemaKind::UInt { .. }
        | SchemaKind::Bool
        | SchemaKind::Enum { .. }
        | SchemaKind::String => {
            let Event::Scalar(text, ..) = event else {
                return Err(LoadError::InvalidValue(format!(
                    "expected a scalar for a {} field",
                    schema.kind_name()
                )));
            };
            write_scalar(schema, target, text.as_ref())
        }

        SchemaKind::Flags | SchemaKind::Ignore => Err(LoadError::BadTypeInSchema(schema.kind_name())),

        SchemaKind::Mapping { fields } => {
            if !matches!(event, Event::MappingStart(..)) {
                return Err(LoadError::InvalidValue(format!(
                    "expected a mapping, schema declares {}",
                    schema.kind_name()
                )));
            }
            let data = begin_mapping(schema, target)?;
            stack.push(Frame {
                state: FrameState::InMapping(MappingFrame {
                    fields,
                    seen: vec![false; fields.len()],
                    sub_state: MappingSubState::ExpectKey,
                }),
                schema,
                data,
            });
            Ok(())
        }

        SchemaKind::Sequence {
            element,
            count_offset,
            count_width,
        } => {
            if !matches!(event, Event::SequenceStart(..)) {
                return Err(LoadError::InvalidValue(format!(
                    "expected a sequence, schema declares {}",
                    schema.kind_name()
                )));
            }
            let count_addr = unsafe { parent_base.add(*count_offset) };
            unsafe { placement::write_int(count_addr, *count_width, 0) };
            stack.push(Frame {
                state: FrameState::InSequence(SequenceFrame {
                    element,
                    count: 0,
                    storage: core::ptr::null_mut(),
                    count_field: Some((count_addr, *count_width)),
                    fixed_capacity: None,
                    pointer_slot: Some(target),
                }),
                schema,
                data: target,
            });
            Ok(())
        }

        SchemaKind::SequenceFixed { element, count } => {
            if !matches!(event, Event::SequenceStart(..)) {
                return Err(LoadError::InvalidValue(format!(
                    "expected a sequence, schema declares {}",
                    schema.kind_name()
                )));
            }
            let (storage, pointer_slot) = if schema.flags.contains(SchemaFlags::OWNING_POINTER) {
                let block = placement::alloc_zeroed_block(element.size * count)?;
                unsafe { placement::write_pointer(target, block) };
                (block, Some(target))
            } else {
                (target, None)
            };
            stack.push(Frame {
                state: FrameState::InSequence(SequenceFrame {
                    element,
                    count: 0,
                    storage,
                    count_field: None,
                    fixed_capacity: Some(*count),
                    pointer_slot,
                }),
                schema,
                data: storage,
            });
            Ok(())
        }
    }
}

fn begin_mapping(schema: &Schema, target: *mut u8) -> Result<*mut u8, LoadError> {
    if schema.flags.contains(SchemaFlags::OWNING_POINTER) {
        let block = placement::alloc_zeroed_block(schema.size)?;
        unsafe { placement::write_pointer(target, block) };
        Ok(block)
    } else {
        Ok(target)
    }
}

fn write_scalar(schema: &Schema, target: *mut u8, text: &str) -> Result<(), LoadError> {
    match &schema.kind {
        SchemaKind::Int { width } => {
            let value = scalar::parse_int(text, *width)?;
            let slot = place_owning_scalar(schema, target, *width)?;
            unsafe { placement::write_int(slot, *width, value) };
        }
        SchemaKind::UInt { width } => {
            let value = scalar::parse_uint(text, *width)?;
            let slot = place_owning_scalar(schema, target, *width)?;
            unsafe { placement::write_int(slot, *width, value as i64) };
        }
        SchemaKind::Bool => {
            let value = scalar::parse_bool(text)?;
            let slot = place_owning_scalar(schema, target, 1)?;
            unsafe { placement::write_int(slot, 1, i64::from(value)) };
        }
        SchemaKind::Enum { width, values } => {
            let value = scalar::parse_enum(text, values)?;
            let slot = place_owning_scalar(schema, target, *width)?;
            unsafe { placement::write_int(slot, *width, value) };
        }
        SchemaKind::String => {
            if !schema.flags.contains(SchemaFlags::OWNING_POINTER) {
                return Err(LoadError::Internal(
                    "string fields must be declared OWNING_POINTER",
                ));
            }
            let (block, _size) = unsafe { placement::write_string(core::ptr::null_mut(), 0, text)? };
            unsafe { placement::write_pointer(target, block) };
        }
        _ => return Err(LoadError::BadTypeInSchema(schema.kind_name())),
    }
    Ok(())
}

/// For a non-string scalar carrying `OWNING_POINTER`: allocates `width`
/// zeroed bytes (the scalar's own width, not `schema.size` — which, for a
/// sequence's element schema, instead holds the array's per-slot stride),
/// writes the allocation's address at `target`, and returns the allocation
/// as the slot the scalar's bytes belong in. Otherwise `target` is already
/// the slot (the value is embedded inline).
///
/// `String` is not routed through here: its own allocation size is only
/// known once the scalar text is in hand, so it allocates directly in
/// `write_scalar`.
fn place_owning_scalar(schema: &Schema, target: *mut u8, width: usize) -> Result<*mut u8, LoadError> {
    if !schema.flags.contains(SchemaFlags::OWNING_POINTER) {
        return Ok(target);
    }
    let block = placement::alloc_zeroed_block(width)?;
    unsafe { placement::write_pointer(target, block) };
    Ok(block)
}
