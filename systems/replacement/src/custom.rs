//! Which entity slots carry a custom definition, and how they come to.

use horde_core::{Command, EntitySlot, EntitySnapshot, Event, Host, Vec2, MAX_ENTITY_SLOTS};
use horde_definitions::{DefinitionRegistry, EntityDefinition};
use horde_scripting::{HookCall, HookDispatcher};

use crate::{overrides, ReplacementTracker};

/// Attachments of custom definitions to host entity slots.
///
/// Slots refer to definitions by name; every lookup resolves the name
/// through the registry, so a reload simply stops resolving definitions that
/// disappeared.
#[derive(Clone, Debug)]
pub struct CustomEntities {
    tracker: ReplacementTracker,
    attachments: Vec<Option<String>>,
}

impl CustomEntities {
    /// Creates an arena with every slot dirty and nothing attached.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tracker: ReplacementTracker::new(),
            attachments: vec![None; MAX_ENTITY_SLOTS],
        }
    }

    /// Processed flags of every slot.
    #[must_use]
    pub const fn tracker(&self) -> &ReplacementTracker {
        &self.tracker
    }

    /// Name of the definition attached to the slot.
    #[must_use]
    pub fn definition_name(&self, slot: EntitySlot) -> Option<&str> {
        self.attachments.get(slot.index())?.as_deref()
    }

    /// Definition attached to the slot, resolved through `registry`.
    #[must_use]
    pub fn resolve<'r>(
        &self,
        slot: EntitySlot,
        registry: &'r DefinitionRegistry,
    ) -> Option<&'r EntityDefinition> {
        registry.find_entity(self.definition_name(slot)?)
    }

    /// Number of slots carrying a definition.
    #[must_use]
    pub fn attached_count(&self) -> usize {
        self.attachments.iter().flatten().count()
    }

    /// Attaches the named definition to the slot.
    pub fn attach(&mut self, slot: EntitySlot, definition: &str) {
        if let Some(attachment) = self.attachments.get_mut(slot.index()) {
            *attachment = Some(definition.to_owned());
        }
    }

    /// Removes the slot's attachment, returning the definition name it held.
    pub fn detach(&mut self, slot: EntitySlot) -> Option<String> {
        self.attachments.get_mut(slot.index())?.take()
    }

    /// Flags the slot for another replacement inspection.
    pub fn mark_dirty(&mut self, slot: EntitySlot) {
        self.tracker.mark_dirty(slot);
    }

    /// Records that the host placed a fresh entity into the slot.
    pub fn on_spawned(&mut self, slot: EntitySlot) {
        let _ = self.detach(slot);
        self.tracker.mark_dirty(slot);
    }

    /// Forgets every attachment and dirties every slot.
    pub fn clear(&mut self) {
        self.attachments.fill(None);
        self.tracker.reset();
    }

    /// Executes a command against the host and books any entity it spawned.
    pub fn execute<H>(&mut self, host: &mut H, command: Command, out_events: &mut Vec<Event>)
    where
        H: Host + ?Sized,
    {
        let start = out_events.len();
        host.apply(command, out_events);
        for event in &out_events[start..] {
            if let Event::EntitySpawned { slot, .. } = event {
                self.on_spawned(*slot);
            }
        }
    }

    /// Executes every queued command in order, leaving `commands` empty.
    pub fn execute_all<H>(
        &mut self,
        host: &mut H,
        commands: &mut Vec<Command>,
        out_events: &mut Vec<Event>,
    ) where
        H: Host + ?Sized,
    {
        for command in commands.drain(..) {
            self.execute(host, command, out_events);
        }
    }

    /// Runs the per-tick pass over every active entity.
    ///
    /// Custom entities that drift out of sync are flagged for the host, and
    /// each slot that is dirty gets its definition re-applied or is offered
    /// to the definitions that replace its archetype.
    pub fn sweep<H>(
        &mut self,
        host: &mut H,
        registry: &DefinitionRegistry,
        dispatcher: &mut HookDispatcher,
        out_events: &mut Vec<Event>,
    ) where
        H: Host + ?Sized,
    {
        let view = host.entity_view();
        for entity in view.iter() {
            let aggressive = self
                .resolve(entity.slot, registry)
                .is_some_and(EntityDefinition::should_aggressively_update);
            if aggressive {
                self.execute(host, Command::MarkForSync { slot: entity.slot }, out_events);
            }

            if self.tracker.try_consume(entity.slot) {
                self.refresh(host, entity, registry, dispatcher, out_events);
            }
        }
    }

    /// Spawns a new host entity carrying `definition` with its bottom centre
    /// at `position`.
    ///
    /// The entity is attached, overridden and marked processed before its
    /// spawn hook runs. Returns `None` when the host refused the spawn.
    pub fn spawn<H>(
        &mut self,
        host: &mut H,
        definition: &EntityDefinition,
        position: Vec2,
        dispatcher: &mut HookDispatcher,
        out_events: &mut Vec<Event>,
    ) -> Option<EntitySlot>
    where
        H: Host + ?Sized,
    {
        let start = out_events.len();
        self.execute(
            host,
            Command::SpawnEntity {
                archetype: definition.base_type(),
                position,
            },
            out_events,
        );
        let spawned = out_events[start..].iter().find_map(|event| match event {
            Event::EntitySpawned { slot, .. } => Some(*slot),
            _ => None,
        });
        let Some(slot) = spawned else {
            tracing::debug!(definition = definition.name(), "host refused custom spawn");
            return None;
        };

        self.attach(slot, definition.name());
        let _ = self.tracker.try_consume(slot);
        let entity = host.entity(slot)?;
        self.adopt(host, &entity, definition, dispatcher, out_events);
        Some(slot)
    }

    fn refresh<H>(
        &mut self,
        host: &mut H,
        entity: &EntitySnapshot,
        registry: &DefinitionRegistry,
        dispatcher: &mut HookDispatcher,
        out_events: &mut Vec<Event>,
    ) where
        H: Host + ?Sized,
    {
        if let Some(definition) = self.resolve(entity.slot, registry) {
            if definition.base_type() == entity.archetype {
                let _ = overrides::apply_to(host, entity, definition, out_events);
                return;
            }
            tracing::debug!(
                slot = entity.slot.get(),
                definition = definition.name(),
                archetype = entity.archetype,
                "custom entity changed archetype"
            );
        }
        let _ = self.detach(entity.slot);

        let mut commands = Vec::new();
        let replacement = registry
            .entities()
            .iter()
            .filter(|definition| {
                definition.spawning().should_replace && definition.base_type() == entity.archetype
            })
            .find(|definition| {
                dispatcher.invoke_flag(
                    definition.name(),
                    definition.hooks(),
                    &HookCall::CheckReplace { entity },
                    &mut commands,
                )
            });
        self.execute_all(host, &mut commands, out_events);

        if let Some(definition) = replacement {
            tracing::debug!(
                slot = entity.slot.get(),
                definition = definition.name(),
                "entity replaced"
            );
            self.attach(entity.slot, definition.name());
            self.adopt(host, entity, definition, dispatcher, out_events);
        }
    }

    /// Applies the definition to an attached entity and runs its spawn hook.
    fn adopt<H>(
        &mut self,
        host: &mut H,
        entity: &EntitySnapshot,
        definition: &EntityDefinition,
        dispatcher: &mut HookDispatcher,
        out_events: &mut Vec<Event>,
    ) where
        H: Host + ?Sized,
    {
        if !overrides::apply_to(host, entity, definition, out_events) {
            return;
        }
        let Some(entity) = host.entity(entity.slot) else {
            return;
        };
        let mut commands = Vec::new();
        let _ = dispatcher.invoke(
            definition.name(),
            definition.hooks(),
            &HookCall::Spawn { entity: &entity },
            &mut commands,
        );
        self.execute_all(host, &mut commands, out_events);
    }
}

impl Default for CustomEntities {
    fn default() -> Self {
        Self::new()
    }
}
