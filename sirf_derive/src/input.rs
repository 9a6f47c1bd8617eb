use crate::types::{FieldKind, PackDesc, PackField, PackFieldMap, PackHeader, PackKind};
use log::trace;
use syn::{
    parse::Parse, spanned::Spanned, Attribute, Error, Fields, Ident, Token, Type, Visibility,
};

pub fn parse_packet_description(
    struct_name: Ident,
    vis: Visibility,
    attrs: Vec<Attribute>,
    fields: Fields,
    record: bool,
) -> syn::Result<PackDesc> {
    let main_sp = struct_name.span();
    let kind = if record {
        if attrs.iter().any(|a| a.path.is_ident("sirf")) {
            return Err(Error::new(
                main_sp,
                format!("Record {} does not take a sirf attribute", struct_name),
            ));
        }
        PackKind::Record
    } else {
        PackKind::Message(parse_sirf_attr(&attrs, &struct_name)?)
    };
    let comment = extract_item_comment(&attrs);
    let fields = parse_fields(fields)?;

    let ret = PackDesc {
        name: struct_name,
        vis,
        kind,
        comment,
        fields,
    };
    validate_layout(&ret)?;

    if let PackKind::Message(ref header) = ret.kind {
        if let Some(expect) = header.fixed_len {
            if expect != ret.fixed_len() {
                return Err(Error::new(
                    main_sp,
                    format!(
                        "Calculated fixed body size ({}) doesn't match specified ({})",
                        ret.fixed_len(),
                        expect
                    ),
                ));
            }
        }
    }
    Ok(ret)
}

fn validate_layout(desc: &PackDesc) -> syn::Result<()> {
    let last = desc.fields.len().saturating_sub(1);
    for (idx, f) in desc.fields.iter().enumerate() {
        match f.kind {
            FieldKind::Fixed { .. } => {},
            _ if matches!(desc.kind, PackKind::Record) => {
                return Err(Error::new(
                    f.name.span(),
                    "Records must have a fixed size, groups and rest fields are not allowed",
                ));
            },
            FieldKind::Rest if idx != last => {
                return Err(Error::new(
                    f.name.span(),
                    "A rest field must be the last field",
                ));
            },
            FieldKind::Rest => {},
            FieldKind::Group { ref count, .. } => {
                let counter = desc.fields[..idx]
                    .iter()
                    .find(|x| x.name == *count)
                    .ok_or_else(|| {
                        Error::new(
                            count.span(),
                            format!("Count field {} must be declared before {}", count, f.name),
                        )
                    })?;
                let valid: [Type; 2] = [syn::parse_quote!(u8), syn::parse_quote!(u16)];
                if !valid.contains(&counter.ty) {
                    return Err(Error::new(
                        counter.ty.span(),
                        "Count field must be u8 or u16",
                    ));
                }
            },
        }
    }
    Ok(())
}

fn parse_sirf_attr(attrs: &[Attribute], struct_name: &Ident) -> syn::Result<PackHeader> {
    let attr = attrs
        .iter()
        .find(|a| a.path.is_ident("sirf"))
        .ok_or_else(|| {
            Error::new(
                struct_name.span(),
                format!("No sirf attribute for payload struct {}", struct_name),
            )
        })?;
    let meta = attr.parse_meta()?;
    trace!("parse_sirf_attr: sirf meta {:?}", meta);
    let meta = match meta {
        syn::Meta::List(x) => x,
        _ => return Err(Error::new(meta.span(), "Invalid sirf attribute syntax")),
    };

    let mut mid = None;
    let mut sid = None;
    let mut fixed_len = None;

    for e in &meta.nested {
        match e {
            syn::NestedMeta::Meta(syn::Meta::NameValue(syn::MetaNameValue {
                path, lit, ..
            })) => {
                let value = match lit {
                    syn::Lit::Int(x) => x,
                    _ => return Err(Error::new(lit.span(), "Should be integer literal")),
                };
                if path.is_ident("mid") {
                    if mid.is_some() {
                        return Err(Error::new(e.span(), "Duplicate \"mid\" attribute"));
                    }
                    mid = Some(value.base10_parse::<u8>()?);
                } else if path.is_ident("sid") {
                    if sid.is_some() {
                        return Err(Error::new(e.span(), "Duplicate \"sid\" attribute"));
                    }
                    sid = Some(value.base10_parse::<u8>()?);
                } else if path.is_ident("fixed_len") {
                    if fixed_len.is_some() {
                        return Err(Error::new(e.span(), "Duplicate \"fixed_len\" attribute"));
                    }
                    fixed_len = Some(value.base10_parse::<usize>()?);
                } else {
                    return Err(Error::new(path.span(), "Unsupported attribute"));
                }
            },
            _ => return Err(Error::new(e.span(), "Unsupported attribute")),
        }
    }
    let mid = mid.ok_or_else(|| Error::new(meta.span(), "No \"mid\" attribute"))?;

    Ok(PackHeader {
        mid,
        sid,
        fixed_len,
    })
}

fn extract_item_comment(attrs: &[Attribute]) -> Vec<Attribute> {
    attrs
        .iter()
        .filter(|a| a.path.is_ident("doc"))
        .cloned()
        .collect()
}

fn parse_fields(fields: Fields) -> syn::Result<Vec<PackField>> {
    let fields = match fields {
        syn::Fields::Named(x) => x,
        _ => {
            return Err(Error::new(fields.span(), "Unsupported fields format"));
        },
    };
    let mut ret = Vec::with_capacity(fields.named.len());
    for f in fields.named {
        let f_sp = f.span();
        let syn::Field {
            ident: name,
            attrs,
            ty,
            ..
        } = f;
        let name = name.ok_or_else(|| Error::new(f_sp, "No field name"))?;
        let comment = extract_item_comment(&attrs);
        let mut map = PackFieldMap::default();
        for a in attrs {
            if !a.path.is_ident("doc") {
                if !a.path.is_ident("sirf") {
                    return Err(Error::new(a.span(), "Unsupported field attribute"));
                }
                if !map.is_none() {
                    return Err(Error::new(
                        a.span(),
                        "Two sirf attributes for the same field",
                    ));
                }
                map = a.parse_args::<PackFieldMap>()?;
            }
        }

        let kind = match vec_element(&ty) {
            Some(elem) => {
                if map.scale.is_some() {
                    return Err(Error::new(ty.span(), "Groups cannot be scaled"));
                }
                match (map.count.take(), map.rest) {
                    (Some(count), false) => FieldKind::Group {
                        elem: elem.clone(),
                        count,
                    },
                    (None, true) => {
                        if *elem != syn::parse_quote!(u8) {
                            return Err(Error::new(ty.span(), "A rest field must be Vec<u8>"));
                        }
                        FieldKind::Rest
                    },
                    _ => {
                        return Err(Error::new(
                            ty.span(),
                            "Vec field needs exactly one of `count = field` or `rest`",
                        ))
                    },
                }
            },
            None => {
                if map.count.is_some() || map.rest {
                    return Err(Error::new(
                        ty.span(),
                        "`count` and `rest` only apply to Vec fields",
                    ));
                }
                FieldKind::Fixed {
                    size: field_size_bytes(&ty)?,
                }
            },
        };

        if map.scale.is_some() != map.alias.is_some() {
            return Err(Error::new(
                name.span(),
                "`scale` and `alias` must be given together",
            ));
        }

        ret.push(PackField {
            name,
            ty,
            kind,
            map,
            comment,
        });
    }

    Ok(ret)
}

mod kw {
    syn::custom_keyword!(count);
    syn::custom_keyword!(rest);
    syn::custom_keyword!(scale);
    syn::custom_keyword!(alias);
}

impl Parse for PackFieldMap {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let mut map = PackFieldMap::default();
        while !input.is_empty() {
            let lookahead = input.lookahead1();
            if lookahead.peek(kw::count) {
                input.parse::<kw::count>()?;
                input.parse::<Token![=]>()?;
                map.count = Some(input.parse()?);
            } else if lookahead.peek(kw::rest) {
                input.parse::<kw::rest>()?;
                map.rest = true;
            } else if lookahead.peek(kw::scale) {
                input.parse::<kw::scale>()?;
                input.parse::<Token![=]>()?;
                map.scale = Some(input.parse()?);
            } else if lookahead.peek(kw::alias) {
                input.parse::<kw::alias>()?;
                input.parse::<Token![=]>()?;
                map.alias = Some(input.parse()?);
            } else {
                return Err(lookahead.error());
            }
            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }
        Ok(map)
    }
}

fn vec_element(ty: &Type) -> Option<&Type> {
    let path = match ty {
        Type::Path(p) if p.qself.is_none() => &p.path,
        _ => return None,
    };
    let last = path.segments.last()?;
    if last.ident != "Vec" {
        return None;
    }
    match last.arguments {
        syn::PathArguments::AngleBracketed(ref args) if args.args.len() == 1 => {
            match args.args[0] {
                syn::GenericArgument::Type(ref elem) => Some(elem),
                _ => None,
            }
        },
        _ => None,
    }
}

fn field_size_bytes(ty: &Type) -> syn::Result<usize> {
    let valid_types: [(Type, usize); 10] = [
        (syn::parse_quote!(u8), 1),
        (syn::parse_quote!(i8), 1),
        (syn::parse_quote!(u16), 2),
        (syn::parse_quote!(i16), 2),
        (syn::parse_quote!(U24), 3),
        (syn::parse_quote!(I24), 3),
        (syn::parse_quote!(u32), 4),
        (syn::parse_quote!(i32), 4),
        (syn::parse_quote!(f32), 4),
        (syn::parse_quote!(f64), 8),
    ];
    if let Type::Array(ref array) = ty {
        let len = match array.len {
            syn::Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Int(ref n),
                ..
            }) => n.base10_parse::<usize>()?,
            _ => {
                return Err(Error::new(
                    array.len.span(),
                    "Array length should be integer literal",
                ))
            },
        };
        return Ok(field_size_bytes(&array.elem)? * len);
    }
    if let Some((_ty, size)) = valid_types.iter().find(|x| x.0 == *ty) {
        Ok(*size)
    } else {
        Err(Error::new(
            ty.span(),
            "Not supported type, expect an integer, U24/I24, f32, f64 or an array of those",
        ))
    }
}
