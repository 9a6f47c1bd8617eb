use crate::types::{FieldKind, PackDesc, PackKind, PacketList};
use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::LitStr;

pub fn generate_types_for_packet(pack_descr: &PackDesc) -> TokenStream {
    let name = &pack_descr.name;
    let vis = &pack_descr.vis;
    let comment = &pack_descr.comment;

    let mut fields = Vec::with_capacity(pack_descr.fields.len());
    let mut getters = Vec::new();
    for f in &pack_descr.fields {
        let field_name = &f.name;
        let ty = &f.ty;
        let field_comment = &f.comment;
        fields.push(quote! {
            #(#field_comment)*
            pub #field_name: #ty
        });

        if let (Some(scale), Some(alias)) = (&f.map.scale, &f.map.alias) {
            getters.push(quote! {
                #(#field_comment)*
                #[inline]
                pub fn #alias(&self) -> f64 {
                    let val = <f64>::from(self.#field_name);
                    val * #scale
                }
            });
        }
    }

    let accessors = if getters.is_empty() {
        quote! {}
    } else {
        quote! {
            impl #name {
                #(#getters)*
            }
        }
    };

    quote! {
        #(#comment)*
        #[derive(Debug, Clone, PartialEq, Default)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #vis struct #name {
            #(#fields),*
        }

        #accessors
    }
}

/// `SirfPacket` implementation: constants plus body encode/decode
pub fn generate_packet_impl(pack_descr: &PackDesc) -> TokenStream {
    let header = match pack_descr.kind {
        PackKind::Message(ref h) => h,
        PackKind::Record => unreachable!("records use generate_record_impl"),
    };
    let name = &pack_descr.name;
    let name_str = LitStr::new(&name.to_string(), Span::call_site());
    let mid = header.mid;
    let sid = match header.sid {
        Some(sid) => quote! { Some(#sid) },
        None => quote! { None },
    };
    let fixed_len = pack_descr.fixed_len();

    let mut len_terms = Vec::new();
    let mut count_checks = Vec::new();
    let mut reads = Vec::with_capacity(pack_descr.fields.len());
    let mut writes = Vec::with_capacity(pack_descr.fields.len());
    let field_names: Vec<_> = pack_descr.fields.iter().map(|f| &f.name).collect();

    for (idx, f) in pack_descr.fields.iter().enumerate() {
        let field_name = &f.name;
        let ty = &f.ty;
        match f.kind {
            FieldKind::Fixed { .. } => {
                reads.push(quote! { let #field_name = r.read::<#ty>()?; });
                writes.push(quote! { w.write(&self.#field_name)?; });
            },
            FieldKind::Group {
                ref elem,
                ref count,
            } => {
                let trailing = pack_descr.fixed_len_after(idx);
                let field_str = LitStr::new(&field_name.to_string(), Span::call_site());
                len_terms.push(quote! {
                    + self.#field_name.len() * <#elem as WireField>::WIRE_LEN
                });
                count_checks.push(quote! {
                    if usize::from(self.#count) != self.#field_name.len() {
                        return Err(CodecError::InvalidField {
                            packet: Self::NAME,
                            field: #field_str,
                        });
                    }
                });
                reads.push(quote! {
                    let #field_name = r.read_group::<#elem>(usize::from(#count), #trailing)?;
                });
                writes.push(quote! { w.write_group(&self.#field_name)?; });
            },
            FieldKind::Rest => {
                let trailing = pack_descr.fixed_len_after(idx);
                len_terms.push(quote! { + self.#field_name.len() });
                reads.push(quote! { let #field_name = r.read_rest(#trailing)?; });
                writes.push(quote! { w.write_bytes(&self.#field_name)?; });
            },
        }
    }

    let encode_arg = if field_names.is_empty() {
        quote! { _w: &mut WireWriter<'_> }
    } else {
        quote! { w: &mut WireWriter<'_> }
    };
    let encode_prologue = if field_names.is_empty() {
        quote! {}
    } else {
        quote! { w.require(self.body_len())?; }
    };

    quote! {
        impl SirfPacket for #name {
            const NAME: &'static str = #name_str;
            const MID: u8 = #mid;
            const SID: Option<u8> = #sid;
            const FIXED_LEN: usize = #fixed_len;

            fn body_len(&self) -> usize {
                Self::FIXED_LEN #(#len_terms)*
            }

            fn decode_body(r: &mut WireReader<'_>) -> Result<Self, CodecError> {
                r.require(Self::FIXED_LEN)?;
                #(#reads)*
                Ok(Self {
                    #(#field_names),*
                })
            }

            fn encode_body(&self, #encode_arg) -> Result<(), CodecError> {
                #(#count_checks)*
                #encode_prologue
                #(#writes)*
                Ok(())
            }
        }
    }
}

/// `WireField` implementation for a group element
pub fn generate_record_impl(pack_descr: &PackDesc) -> TokenStream {
    let name = &pack_descr.name;
    let wire_len = pack_descr.fixed_len();
    let field_names: Vec<_> = pack_descr.fields.iter().map(|f| &f.name).collect();
    let field_types: Vec<_> = pack_descr.fields.iter().map(|f| &f.ty).collect();

    quote! {
        impl WireField for #name {
            const WIRE_LEN: usize = #wire_len;

            fn read(r: &mut WireReader<'_>) -> Result<Self, CodecError> {
                #(let #field_names = r.read::<#field_types>()?;)*
                Ok(Self {
                    #(#field_names),*
                })
            }

            fn write(&self, w: &mut WireWriter<'_>) -> Result<(), CodecError> {
                #(w.write(&self.#field_names)?;)*
                Ok(())
            }
        }
    }
}

pub fn generate_code_for_packet_list(list: &PacketList) -> TokenStream {
    let union_enum_name = &list.enum_name;
    let packets = &list.packets;

    let mut variants = Vec::with_capacity(packets.len() + 1);
    let mut from_impls = Vec::with_capacity(packets.len());
    let mut id_arms = Vec::with_capacity(packets.len() + 1);
    let mut name_arms = Vec::with_capacity(packets.len() + 1);
    let mut len_arms = Vec::with_capacity(packets.len() + 1);
    let mut encode_arms = Vec::with_capacity(packets.len() + 1);
    let mut decoders = Vec::with_capacity(packets.len());

    for pack in packets {
        variants.push(quote! { #pack(#pack) });
        from_impls.push(quote! {
            impl From<#pack> for #union_enum_name {
                fn from(x: #pack) -> Self {
                    #union_enum_name::#pack(x)
                }
            }
        });
        id_arms.push(quote! {
            #union_enum_name::#pack(_) => MessageId::new(
                PROTOCOL,
                <#pack as SirfPacket>::MID,
                <#pack as SirfPacket>::SID,
            )
        });
        name_arms.push(quote! { #union_enum_name::#pack(_) => <#pack as SirfPacket>::NAME });
        len_arms.push(quote! { #union_enum_name::#pack(ref x) => x.body_len() });
        encode_arms.push(quote! { #union_enum_name::#pack(ref x) => x.encode_body(w) });
        decoders.push(quote! {
            if mid == <#pack as SirfPacket>::MID && sid == <#pack as SirfPacket>::SID {
                return decode_exact::<#pack>(body).map(#union_enum_name::#pack);
            }
        });
    }

    if let Some(ref passthrough) = list.passthrough {
        variants.push(quote! { Passthrough(#passthrough) });
        id_arms.push(quote! { #union_enum_name::Passthrough(ref x) => x.message_id(PROTOCOL) });
        name_arms.push(quote! { #union_enum_name::Passthrough(_) => #passthrough::NAME });
        len_arms.push(quote! { #union_enum_name::Passthrough(ref x) => x.body_len() });
        encode_arms.push(quote! { #union_enum_name::Passthrough(ref x) => x.encode_body(w) });
    }

    quote! {
        #[doc = "All message kinds known to this protocol"]
        #[derive(Debug, Clone, PartialEq)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum #union_enum_name {
            #(#variants),*
        }

        #(#from_impls)*

        impl #union_enum_name {
            /// Identifier written in front of the body
            pub fn message_id(&self) -> MessageId {
                match *self {
                    #(#id_arms),*
                }
            }

            pub fn name(&self) -> &'static str {
                match *self {
                    #(#name_arms),*
                }
            }

            /// Encoded size of the body, header bytes excluded
            pub fn body_len(&self) -> usize {
                match *self {
                    #(#len_arms),*
                }
            }

            pub fn encode_body(&self, w: &mut WireWriter<'_>) -> Result<(), CodecError> {
                match *self {
                    #(#encode_arms),*
                }
            }

            pub(crate) fn decode_body(mid: u8, sid: Option<u8>, body: &[u8]) -> Result<Self, CodecError> {
                #(#decoders)*
                Err(CodecError::UnknownId {
                    id: MessageId::new(PROTOCOL, mid, sid),
                })
            }
        }
    }
}
