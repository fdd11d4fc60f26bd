/// One-shot "open the dialog" request raised by the page and acknowledged by
/// the dialog that consumes it.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct OpenRequest {
    raised: bool,
}

impl OpenRequest {
    pub fn raise(&mut self) {
        self.raised = true;
    }

    pub fn is_raised(&self) -> bool {
        self.raised
    }

    pub fn acknowledge(&mut self) {
        self.raised = false;
    }
}

/// Visibility of a dialog. Opens on the rising edge of an [`OpenRequest`];
/// only [`ModalLifecycle::close`] hides it again.
#[derive(Debug, Clone, Default)]
pub struct ModalLifecycle {
    visible: bool,
    last_signal: bool,
}

impl ModalLifecycle {
    pub fn is_open(&self) -> bool {
        self.visible
    }

    /// Returns true when this observation opened the dialog.
    pub fn observe(&mut self, request: &mut OpenRequest) -> bool {
        let signal = request.is_raised();
        let rising = signal && !self.last_signal;
        if rising {
            self.visible = true;
            request.acknowledge();
        }
        self.last_signal = request.is_raised();
        rising
    }

    /// Returns true when the dialog was open.
    pub fn close(&mut self) -> bool {
        std::mem::replace(&mut self.visible, false)
    }
}
