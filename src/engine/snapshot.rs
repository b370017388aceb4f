//! Binary snapshot of a world's state.
//!
//! ## Stream format (version 1, little-endian)
//!
//! ```text
//! magic "ECS\0" (4 bytes)
//! version u32 = 1
//! archetype_count u32                    non-empty archetypes only
//! entity_slot_count u32
//! [ archetype_count x ArchetypeBlock ]
//! slot_count u32
//! generations u32[slot_count]
//! free_list_count u32
//! free_list u32[free_list_count]
//!
//! ArchetypeBlock:
//!   component_count u32
//!   entity_count u32
//!   [ component_count x (name_length u32, name bytes, elem_size u32) ]
//!   [ component_count x (entity_count x serialized value) ]
//!   [ entity_count x (index u32, generation u32) ]
//! ```
//!
//! Component types are identified by stable name, never by dense ID: IDs are
//! assigned per process in observation order, so two processes only agree on
//! names. The reader therefore restores columns in the stream's header
//! order, which need not match the local ID sort order.

use std::io::{Read, Write};

use crate::engine::component::{component_id_by_name, component_name};
use crate::engine::entity::{Entity, EntityRecord};
use crate::engine::error::SnapshotError;
use crate::engine::types::ComponentID;
use crate::engine::world::World;

const MAGIC: [u8; 4] = *b"ECS\0";
const VERSION: u32 = 1;

fn write_u32(out: &mut dyn Write, value: u32) -> Result<(), SnapshotError> {
    out.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn read_u32(input: &mut dyn Read) -> Result<u32, SnapshotError> {
    let mut bytes = [0u8; 4];
    input.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

/// Writes the complete state of `world` to `out`.
///
/// Empty archetypes are skipped; entity slot generations and the free-list
/// are written in full, so restored handles keep their staleness semantics.
///
/// ## Panics
/// Panics when a component type present in a non-empty archetype has no
/// stable name or no serializer. Register every such type with
/// [`register_named`](crate::engine::component::register_named) (or the
/// `_with` variant) before serializing.
pub fn serialize(world: &World, out: &mut dyn Write) -> Result<(), SnapshotError> {
    // Validate before writing a single byte.
    for arch in &world.archetypes {
        if arch.count() == 0 {
            continue;
        }
        for (cid, col) in &arch.columns {
            assert!(
                component_name(*cid).is_some(),
                "serialize: archetype contains a component with no stable name"
            );
            assert!(
                col.ops.serialize_fn.is_some(),
                "serialize: component has no serialize function"
            );
        }
    }

    out.write_all(&MAGIC)?;
    write_u32(out, VERSION)?;

    let archetype_count = world.archetypes.iter().filter(|a| a.count() > 0).count() as u32;
    write_u32(out, archetype_count)?;
    write_u32(out, world.entities.slot_count() as u32)?;

    for arch in &world.archetypes {
        let entity_count = arch.count();
        if entity_count == 0 {
            continue;
        }

        write_u32(out, arch.columns.len() as u32)?;
        write_u32(out, entity_count as u32)?;

        for (cid, col) in &arch.columns {
            let name = component_name(*cid).expect("validated above");
            write_u32(out, name.len() as u32)?;
            out.write_all(name.as_bytes())?;
            write_u32(out, col.elem_size() as u32)?;
        }

        for (_, col) in &arch.columns {
            let ser = col.ops.serialize_fn.expect("validated above");
            for row in 0..entity_count {
                unsafe { ser(col.get(row), out)? };
            }
        }

        for row in 0..entity_count {
            let e = arch.entity_at(row);
            write_u32(out, e.index)?;
            write_u32(out, e.generation)?;
        }
    }

    write_u32(out, world.entities.slot_count() as u32)?;
    for &generation in &world.entities.generations {
        write_u32(out, generation)?;
    }
    write_u32(out, world.entities.free_list.len() as u32)?;
    for &index in &world.entities.free_list {
        write_u32(out, index)?;
    }

    Ok(())
}

/// Restores a snapshot stream into `world`.
///
/// The target world must be empty and every component name in the stream
/// must be registered in this process with a matching element size.
pub fn deserialize(world: &mut World, input: &mut dyn Read) -> Result<(), SnapshotError> {
    if !world.is_empty() {
        return Err(SnapshotError::WorldNotEmpty);
    }

    let mut magic = [0u8; 4];
    input.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(SnapshotError::BadMagic { found: magic });
    }

    let version = read_u32(input)?;
    if version != VERSION {
        return Err(SnapshotError::UnsupportedVersion { found: version });
    }

    let archetype_count = read_u32(input)?;
    let _entity_slot_count = read_u32(input)?;

    for _ in 0..archetype_count {
        let component_count = read_u32(input)?;
        let entity_count = read_u32(input)? as usize;

        // Component headers, in the writer's column order.
        struct ColumnMeta {
            cid: ComponentID,
            name: String,
            elem_size: u32,
        }
        let mut metas = Vec::with_capacity(component_count as usize);
        for _ in 0..component_count {
            let name_len = read_u32(input)? as usize;
            let mut name_bytes = vec![0u8; name_len];
            input.read_exact(&mut name_bytes)?;
            let name = String::from_utf8_lossy(&name_bytes).into_owned();
            let elem_size = read_u32(input)?;

            let cid = component_id_by_name(&name)
                .ok_or_else(|| SnapshotError::UnknownComponent { name: name.clone() })?;
            metas.push(ColumnMeta { cid, name, elem_size });
        }

        let ts = crate::engine::archetype::TypeSet::new(metas.iter().map(|m| m.cid).collect());
        let aid = world.get_or_create_archetype(ts);
        let arch = &mut world.archetypes[aid as usize];
        arch.ensure_capacity(entity_count);

        // Column data, in stream header order. Local IDs may sort the
        // columns differently than the writing process did.
        for meta in &metas {
            let col = arch
                .find_column_mut(meta.cid)
                .expect("restored archetype missing column");
            if col.elem_size() as u32 != meta.elem_size {
                return Err(SnapshotError::SizeMismatch {
                    name: meta.name.clone(),
                    stored: meta.elem_size,
                    local: col.elem_size() as u32,
                });
            }
            let deser = col
                .ops
                .deserialize_fn
                .expect("name-registered component without deserializer");
            for row in 0..entity_count {
                unsafe { deser(col.get(row), input)? };
                col.count = row + 1;
            }
        }

        arch.entities.clear();
        arch.entities.reserve(entity_count);
        for _ in 0..entity_count {
            let index = read_u32(input)?;
            let generation = read_u32(input)?;
            arch.entities.push(Entity { index, generation });
        }
        arch.assert_parity();
    }

    let slot_count = read_u32(input)? as usize;
    let mut generations = Vec::with_capacity(slot_count);
    for _ in 0..slot_count {
        generations.push(read_u32(input)?);
    }
    let free_list_count = read_u32(input)? as usize;
    let mut free_list = Vec::with_capacity(free_list_count);
    for _ in 0..free_list_count {
        free_list.push(read_u32(input)?);
    }

    world.entities.generations = generations;
    world.entities.free_list = free_list;
    world.entities.records = vec![EntityRecord::default(); world.entities.generations.len()];

    // Rebuild records by scanning every restored archetype.
    for (aid, arch) in world.archetypes.iter().enumerate() {
        for row in 0..arch.count() {
            let e = arch.entity_at(row);
            world.entities.records[e.index as usize] = EntityRecord {
                archetype: Some(aid as u32),
                row,
            };
        }
    }

    Ok(())
}
