//! Conflict handlers: passes which run over the superimposed tree after
//! composition, each repairing a class of situations that identifier-based
//! superimposition gets wrong on its own.

pub(crate) mod duplicate_declarations;
pub(crate) mod initialization_blocks;
pub(crate) mod new_element_reference;
pub(crate) mod renaming;
pub(crate) mod type_ambiguity;

use crate::{config::MergeConfig, context::MergeContext, error::TextualMergeError};

use duplicate_declarations::DuplicateDeclarationsHandler;
use initialization_blocks::InitializationBlocksHandler;
use new_element_reference::NewElementReferencingEditedOneHandler;
use renaming::MethodRenamingAndDeletionHandler;
use type_ambiguity::TypeAmbiguityHandler;

/// A single conflict handler.
///
/// Handlers are independent of each other: each one receives the shared
/// context, may edit the superimposed tree and the diagnostics, and can only
/// fail when a body re-merge fails internally.
pub trait ConflictHandler {
    fn name(&self) -> &'static str;
    fn handle(&self, context: &mut MergeContext) -> Result<(), TextualMergeError>;
}

/// The handlers enabled by the configuration, in their fixed execution order.
pub fn enabled_handlers(config: &MergeConfig) -> Vec<Box<dyn ConflictHandler>> {
    let mut handlers: Vec<Box<dyn ConflictHandler>> = Vec::new();
    if config.handle_type_ambiguity_error {
        handlers.push(Box::new(TypeAmbiguityHandler));
    }
    if config.handle_initialization_blocks {
        handlers.push(Box::new(InitializationBlocksHandler));
    }
    if config.handle_new_element_referencing_edited_one {
        handlers.push(Box::new(NewElementReferencingEditedOneHandler));
    }
    if config.handle_duplicate_declarations {
        handlers.push(Box::new(DuplicateDeclarationsHandler));
    }
    if config.handle_method_and_constructor_renaming_deletion {
        handlers.push(Box::new(MethodRenamingAndDeletionHandler));
    }
    handlers
}
