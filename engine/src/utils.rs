use crate::types::GateKind;

pub fn form_expr(inex: &[String], kind: GateKind) -> String {
    // some operators would be infix, some prefix.
    match kind {
        GateKind::Input => String::new(),
        GateKind::Output => inex.first().cloned().unwrap_or_default(),
        GateKind::Not => format!("!{}", inex.first().map(String::as_str).unwrap_or("")),
        _ => {
            let joined = if inex.len() == 1 {
                inex[0].clone()
            } else {
                format!("({})", inex.join(kind.symbol()))
            };
            if kind.is_inverted() {
                if joined.starts_with('(') {
                    format!("!{}", joined)
                } else {
                    format!("!({})", joined)
                }
            } else {
                joined
            }
        }
    }
}
