use syn::{braced, parse::Parse, punctuated::Punctuated, Attribute, Ident, Token, Type, Visibility};

pub struct PackDesc {
    pub name: Ident,
    pub vis: Visibility,
    pub kind: PackKind,
    pub comment: Vec<Attribute>,
    pub fields: Vec<PackField>,
}

impl PackDesc {
    /// Size of everything except count-prefixed groups and trailing blobs.
    pub fn fixed_len(&self) -> usize {
        PackDesc::fields_size(self.fields.iter())
    }

    /// Fixed bytes that follow the field at `idx`; a group must leave room for them.
    pub fn fixed_len_after(&self, idx: usize) -> usize {
        PackDesc::fields_size(self.fields.iter().skip(idx + 1))
    }

    fn fields_size<'a, I: Iterator<Item = &'a PackField>>(iter: I) -> usize {
        iter.map(|f| match f.kind {
            FieldKind::Fixed { size } => size,
            _ => 0,
        })
        .sum()
    }
}

pub enum PackKind {
    Message(PackHeader),
    Record,
}

pub struct PackHeader {
    pub mid: u8,
    pub sid: Option<u8>,
    pub fixed_len: Option<usize>,
}

pub struct PackField {
    pub name: Ident,
    pub ty: Type,
    pub kind: FieldKind,
    pub map: PackFieldMap,
    pub comment: Vec<Attribute>,
}

pub enum FieldKind {
    Fixed { size: usize },
    /// `Vec<elem>` whose length is carried by an earlier field
    Group { elem: Type, count: Ident },
    /// opaque bytes up to the end of the body
    Rest,
}

#[derive(Default)]
pub struct PackFieldMap {
    pub count: Option<Ident>,
    pub rest: bool,
    pub scale: Option<syn::LitFloat>,
    pub alias: Option<Ident>,
}

impl PackFieldMap {
    pub fn is_none(&self) -> bool {
        self.count.is_none() && !self.rest && self.scale.is_none() && self.alias.is_none()
    }
}

pub struct PacketList {
    pub enum_name: Ident,
    pub passthrough: Option<Ident>,
    pub packets: Vec<Ident>,
}

impl Parse for PacketList {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        input.parse::<Token![enum]>()?;
        let enum_name: Ident = input.parse()?;
        let content;
        let _brace_token: syn::token::Brace = braced!(content in input);
        let passthrough = if content.peek(Token![_]) {
            content.parse::<Token![_]>()?;
            content.parse::<Token![=]>()?;
            let ty: Ident = content.parse()?;
            content.parse::<Token![,]>()?;
            Some(ty)
        } else {
            None
        };
        let packs: Punctuated<Ident, Token![,]> = content.parse_terminated(Ident::parse)?;
        Ok(Self {
            enum_name,
            passthrough,
            packets: packs.into_iter().collect(),
        })
    }
}
