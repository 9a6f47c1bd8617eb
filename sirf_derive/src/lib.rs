extern crate proc_macro;

mod input;
mod output;
mod types;

use proc_macro2::TokenStream;
use syn::{parse_macro_input, Attribute, Fields, Ident, Visibility};

use crate::types::{PackKind, PacketList};

/// Declares a message schema.
///
/// ```ignore
/// #[sirf_packet]
/// #[sirf(mid = 0x07, fixed_len = 19)]
/// struct ClockStatus {
///     ext_gps_week: u16,
///     #[sirf(scale = 1e-2, alias = gps_tow_seconds)]
///     gps_tow: u32,
///     /* ... */
/// }
/// ```
///
/// Generates the public struct plus its `SirfPacket` implementation.
#[proc_macro_attribute]
pub fn sirf_packet(
    attr: proc_macro::TokenStream,
    input: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    assert!(attr.is_empty());
    let input = parse_macro_input!(input as syn::ItemStruct);
    generate_code_for_packet(input.ident, input.vis, input.attrs, input.fields, false)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

/// Declares a fixed-size record used inside count-prefixed groups.
/// Generates the public struct plus its `WireField` implementation.
#[proc_macro_attribute]
pub fn sirf_record(
    attr: proc_macro::TokenStream,
    input: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    assert!(attr.is_empty());
    let input = parse_macro_input!(input as syn::ItemStruct);
    generate_code_for_packet(input.ident, input.vis, input.attrs, input.fields, true)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

/// Builds the closed message enum of one protocol plus its dispatch code.
///
/// ```ignore
/// define_packets!(
///     enum SsbMessage {
///         _ = Passthrough,
///         MeasuredNavigation,
///         ClockStatus,
///     }
/// );
/// ```
#[proc_macro]
pub fn define_packets(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(input as PacketList);
    do_define_packets(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

fn generate_code_for_packet(
    name: Ident,
    vis: Visibility,
    attrs: Vec<Attribute>,
    fields: Fields,
    record: bool,
) -> syn::Result<TokenStream> {
    let desc = input::parse_packet_description(name, vis, attrs, fields, record)?;
    log::trace!("generate_code_for_packet: {}", desc.name);

    let mut code = output::generate_types_for_packet(&desc);
    match desc.kind {
        PackKind::Message(_) => code.extend(output::generate_packet_impl(&desc)),
        PackKind::Record => code.extend(output::generate_record_impl(&desc)),
    }
    Ok(code)
}

fn do_define_packets(input: PacketList) -> syn::Result<TokenStream> {
    let mut names = std::collections::HashSet::new();
    for name in &input.packets {
        if !names.insert(name.to_string()) {
            return Err(syn::Error::new(
                name.span(),
                format!("Duplicate packet {} in {}", name, input.enum_name),
            ));
        }
    }
    if let Some(ref passthrough) = input.passthrough {
        if names.contains(&passthrough.to_string()) {
            return Err(syn::Error::new(
                passthrough.span(),
                "Pass-through type is also listed as a schema packet",
            ));
        }
    }
    Ok(output::generate_code_for_packet_list(&input))
}
