use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use prompt_core::use_context;
use prompt_screen::Interaction;

type Handler = Rc<dyn Fn(&Interaction)>;

/// Maps component ids to the handlers registered by the latest render.
///
/// The session provides one router per prompt through the hook store; it is
/// emptied at the start of every render, so only components the prompt still
/// renders receive interactions.
#[derive(Default)]
pub struct InteractionRouter {
    handlers: RefCell<HashMap<String, Handler>>,
}

impl InteractionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn begin_render(&self) {
        self.handlers.borrow_mut().clear();
    }

    pub fn register(&self, custom_id: impl Into<String>, handler: impl Fn(&Interaction) + 'static) {
        let custom_id = custom_id.into();
        let previous = self
            .handlers
            .borrow_mut()
            .insert(custom_id.clone(), Rc::new(handler));
        if previous.is_some() {
            log::warn!("interaction handler for {custom_id} registered twice in one render");
        }
    }

    pub fn has_handler(&self, custom_id: &str) -> bool {
        self.handlers.borrow().contains_key(custom_id)
    }

    pub fn len(&self) -> usize {
        self.handlers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run the handler for `interaction.custom_id`. Returns `false` when none
    /// is registered.
    pub fn dispatch(&self, interaction: &Interaction) -> bool {
        let handler = self.handlers.borrow().get(&interaction.custom_id).cloned();
        match handler {
            Some(handler) => {
                handler(interaction);
                true
            }
            None => false,
        }
    }
}

/// Handle interactions from the component with `custom_id`.
///
/// Buttons, select menus and modal submissions all arrive here; read
/// [`Interaction::values`] or [`Interaction::field`] for their data. Must be
/// called while a session renders its prompt.
pub fn use_interaction(custom_id: impl Into<String>, handler: impl Fn(&Interaction) + 'static) {
    match use_context::<InteractionRouter>() {
        Some(router) => router.register(custom_id, handler),
        None => panic!("use_interaction requires a prompt rendered by a PromptSession"),
    }
}
